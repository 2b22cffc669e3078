//! Database schema and queries

pub mod init;
pub mod setlists;
pub mod songs;

pub use init::{create_schema, init_database, init_memory_database};
