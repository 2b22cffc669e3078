//! HTTP API handlers

pub mod entries;
pub mod health;
pub mod setlists;
pub mod songs;

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::AppState;

pub use health::health_routes;

/// Catalog and import routes
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/api/songs", get(songs::list_songs).post(songs::create_song))
        .route("/api/songs/import", post(songs::import_songs))
        .route("/api/songs/:song_id", delete(songs::delete_song))
}

/// Setlist and entry routes
pub fn setlist_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/setlists",
            get(setlists::list_setlists).post(setlists::create_setlist),
        )
        .route(
            "/api/setlists/:id",
            get(setlists::get_setlist).delete(setlists::delete_setlist),
        )
        .route("/api/setlists/:id/regenerate", post(setlists::regenerate))
        .route("/api/setlists/:id/reorder", post(entries::reorder))
        .route("/api/setlists/:id/songs", post(entries::add_song))
        .route(
            "/api/setlists/:id/available-songs",
            get(setlists::available_songs),
        )
        .route(
            "/api/setlists/:id/entries/:entry_id/remove",
            post(entries::remove_entry),
        )
        .route(
            "/api/setlists/:id/entries/:entry_id/move",
            post(entries::move_entry),
        )
        .route(
            "/api/setlists/:id/entries/:entry_id/encore-break",
            post(entries::add_encore_break),
        )
        .route(
            "/api/setlists/:id/encore-break",
            delete(entries::remove_encore_break),
        )
}
