//! # Setlist Common Library
//!
//! Shared code for the setlist service:
//! - Song and setlist models with derived running-time aggregates
//! - Quota selector fitting songs into a target duration
//! - Ordering engine (reorder, encore break, add/remove entries)
//! - Bulk import validation
//! - SQLite persistence and the transactional `Library` facade
//! - Configuration loading

pub mod config;
pub mod db;
pub mod duration;
pub mod error;
pub mod import;
pub mod library;
pub mod locks;
pub mod models;
pub mod ordering;
pub mod selector;

pub use error::{Error, Result};
pub use library::Library;
