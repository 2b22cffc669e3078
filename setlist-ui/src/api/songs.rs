//! Song catalog endpoints

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::info;
use uuid::Uuid;

use setlist_common::duration::format_label;
use setlist_common::import::{self, Rejection};
use setlist_common::library::SongRemoval;
use setlist_common::models::Song;

use crate::{ApiError, ApiResult, AppState};

/// Catalog song with its display fields
#[derive(Debug, Serialize)]
pub struct SongView {
    #[serde(flatten)]
    pub song: Song,
    /// Alias when set, otherwise the title
    pub print_title: String,
    /// `m:ss`
    pub duration_label: String,
    /// Tag codes, e.g. `"M, CVR"`
    pub tag_summary: String,
    pub tag_labels: Vec<&'static str>,
}

impl From<Song> for SongView {
    fn from(song: Song) -> Self {
        Self {
            print_title: song.print_title().to_string(),
            duration_label: format_label(song.duration_seconds),
            tag_summary: song.tag_summary(),
            tag_labels: song.tags.iter().map(|tag| tag.label()).collect(),
            song,
        }
    }
}

pub(crate) fn song_views(songs: Vec<Song>) -> Vec<SongView> {
    songs.into_iter().map(SongView::from).collect()
}

/// Result of a bulk import
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub accepted_count: usize,
    pub rejected_count: usize,
    pub accepted: Vec<SongView>,
    pub rejected: Vec<Rejection>,
}

/// GET /api/songs
pub async fn list_songs(State(state): State<AppState>) -> ApiResult<Json<Vec<SongView>>> {
    Ok(Json(song_views(state.library.list_songs().await?)))
}

/// POST /api/songs
///
/// Body is one flat JSON object with the same columns as an import row.
pub async fn create_song(
    State(state): State<AppState>,
    payload: Result<Json<Map<String, Value>>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SongView>)> {
    let Json(object) = payload?;
    let row = import::row_from_object(object);
    let song = state.library.create_song(&row).await?;
    Ok((StatusCode::CREATED, Json(song.into())))
}

/// DELETE /api/songs/:song_id
///
/// Removes the song from every setlist holding it, then from the catalog.
pub async fn delete_song(
    State(state): State<AppState>,
    Path(song_id): Path<Uuid>,
) -> ApiResult<Json<SongRemoval>> {
    Ok(Json(state.library.delete_song(song_id).await?))
}

fn is_csv(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains("csv"))
}

/// POST /api/songs/import
///
/// Accepts `text/csv` with a header row, otherwise a JSON array of objects.
pub async fn import_songs(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<ImportResponse>> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty import payload".to_string()));
    }

    let rows = if is_csv(&headers) {
        import::rows_from_csv(&body)?
    } else {
        import::rows_from_json(&body)?
    };
    info!("Import request with {} rows", rows.len());

    let report = state.library.import(&rows).await?;
    Ok(Json(ImportResponse {
        accepted_count: report.accepted.len(),
        rejected_count: report.rejected.len(),
        accepted: song_views(report.accepted),
        rejected: report.rejected,
    }))
}
