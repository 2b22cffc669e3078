//! Entry ordering endpoints
//!
//! Every mutation answers with the refreshed aggregates so a client can
//! update durations without reloading the setlist.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use setlist_common::models::SetlistSummary;
use setlist_common::ordering::Direction;

use super::setlists::SetlistView;
use crate::{ApiResult, AppState};

/// Body of `POST /api/setlists/:id/reorder`: song entry ids, encore break omitted
#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub order: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AddSongRequest {
    pub song_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub direction: Direction,
}

#[derive(Debug, Serialize)]
pub struct AddSongResponse {
    pub entry_id: Uuid,
    pub position: u32,
    pub summary: SetlistSummary,
}

/// POST /api/setlists/:id/reorder
pub async fn reorder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> ApiResult<Json<SetlistView>> {
    let Json(request) = payload?;
    Ok(Json(state.library.reorder(id, &request.order).await?.into()))
}

/// POST /api/setlists/:id/songs
pub async fn add_song(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Result<Json<AddSongRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AddSongResponse>)> {
    let Json(request) = payload?;
    let added = state.library.add_song(id, request.song_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(AddSongResponse {
            entry_id: added.entry_id,
            position: added.position,
            summary: added.setlist.summary(),
        }),
    ))
}

/// POST /api/setlists/:id/entries/:entry_id/remove
pub async fn remove_entry(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SetlistView>> {
    Ok(Json(state.library.remove_entry(id, entry_id).await?.into()))
}

/// POST /api/setlists/:id/entries/:entry_id/move
pub async fn move_entry(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> ApiResult<Json<SetlistView>> {
    let Json(request) = payload?;
    let setlist = state
        .library
        .move_entry(id, entry_id, request.direction)
        .await?;
    Ok(Json(setlist.into()))
}

/// POST /api/setlists/:id/entries/:entry_id/encore-break
pub async fn add_encore_break(
    State(state): State<AppState>,
    Path((id, entry_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<SetlistView>> {
    Ok(Json(state.library.add_encore_break(id, entry_id).await?.into()))
}

/// DELETE /api/setlists/:id/encore-break
pub async fn remove_encore_break(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SetlistView>> {
    Ok(Json(state.library.remove_encore_break(id).await?.into()))
}
