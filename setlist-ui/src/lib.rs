//! setlist-ui library - HTTP service over the setlist engine
//!
//! JSON endpoints for the song catalog, bulk import, setlist generation and
//! hand-tuning of entry order.

use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use setlist_common::Library;

pub mod api;
pub mod error;

pub use error::{ApiError, ApiResult};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
}

impl AppState {
    pub fn new(library: Library) -> Self {
        Self {
            library: Arc::new(library),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::song_routes())
        .merge(api::setlist_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
