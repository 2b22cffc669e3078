//! Setlist endpoints: listing, creation, generation and deletion

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use setlist_common::duration::{hms_opt, parse_hms};
use setlist_common::library::NewSetlist;
use setlist_common::models::{Entry, Section, Setlist, SetlistSummary};

use super::songs::{song_views, SongView};
use crate::{ApiResult, AppState};

/// One entry with the section its song plays in
#[derive(Debug, Serialize)]
pub struct EntryView {
    #[serde(flatten)]
    pub entry: Entry,
    /// Absent for the encore break itself
    pub section: Option<Section>,
}

/// Full setlist with its derived aggregates
#[derive(Debug, Serialize)]
pub struct SetlistView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "hms_opt")]
    pub target_duration: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub entries: Vec<EntryView>,
    pub summary: SetlistSummary,
}

impl From<Setlist> for SetlistView {
    fn from(setlist: Setlist) -> Self {
        let summary = setlist.summary();
        let entries = setlist
            .entries()
            .iter()
            .enumerate()
            .map(|(index, entry)| EntryView {
                section: (!entry.is_encore_break()).then(|| setlist.section_of(index)),
                entry: entry.clone(),
            })
            .collect();
        Self {
            id: setlist.id,
            name: setlist.name,
            description: setlist.description,
            target_duration: setlist.target_duration,
            created_at: setlist.created_at,
            entries,
            summary,
        }
    }
}

/// Setlist row in the overview listing
#[derive(Debug, Serialize)]
pub struct SetlistOverview {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "hms_opt")]
    pub target_duration: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub summary: SetlistSummary,
}

impl From<&Setlist> for SetlistOverview {
    fn from(setlist: &Setlist) -> Self {
        Self {
            id: setlist.id,
            name: setlist.name.clone(),
            description: setlist.description.clone(),
            target_duration: setlist.target_duration,
            created_at: setlist.created_at,
            summary: setlist.summary(),
        }
    }
}

fn default_generate() -> bool {
    true
}

/// Body of `POST /api/setlists`
#[derive(Debug, Deserialize)]
pub struct CreateSetlistRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// `mm:ss`, `hh:mm:ss` or decimal minutes
    #[serde(default)]
    pub target_duration: Option<String>,
    /// Fill from the catalog; false creates an empty setlist
    #[serde(default = "default_generate")]
    pub generate: bool,
}

/// GET /api/setlists
pub async fn list_setlists(State(state): State<AppState>) -> ApiResult<Json<Vec<SetlistOverview>>> {
    let setlists = state.library.list_setlists().await?;
    Ok(Json(setlists.iter().map(SetlistOverview::from).collect()))
}

/// POST /api/setlists
pub async fn create_setlist(
    State(state): State<AppState>,
    payload: Result<Json<CreateSetlistRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SetlistView>)> {
    let Json(request) = payload?;
    let target_duration = request
        .target_duration
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(parse_hms)
        .transpose()?;

    let setlist = state
        .library
        .create_setlist(NewSetlist {
            name: request.name,
            description: request.description,
            target_duration,
            generate: request.generate,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(setlist.into())))
}

/// GET /api/setlists/:id
pub async fn get_setlist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SetlistView>> {
    Ok(Json(state.library.get_setlist(id).await?.into()))
}

/// DELETE /api/setlists/:id
pub async fn delete_setlist(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.library.delete_setlist(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/setlists/:id/regenerate
pub async fn regenerate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SetlistView>> {
    Ok(Json(state.library.regenerate(id).await?.into()))
}

/// GET /api/setlists/:id/available-songs
pub async fn available_songs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<SongView>>> {
    Ok(Json(song_views(state.library.available_songs(id).await?)))
}
