//! Error responses for the HTTP surface

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use setlist_common::Error;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Request body was not valid JSON for the endpoint (400)
    #[error(transparent)]
    Json(#[from] JsonRejection),

    /// Engine or storage error, mapped per kind
    #[error(transparent)]
    Common(#[from] Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Json(_) => StatusCode::BAD_REQUEST,
            ApiError::Common(err) => match err {
                Error::SongNotFound(_) | Error::SetlistNotFound(_) | Error::EntryNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                Error::DuplicateSong(_)
                | Error::MarkerExists
                | Error::OrderMismatch(_)
                | Error::SongInUse(_) => StatusCode::CONFLICT,
                Error::RegenerateWithoutTarget | Error::EmptyCatalog => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                Error::MissingField(_)
                | Error::InvalidDuration(_)
                | Error::InvalidEnergy(_)
                | Error::UnknownTag(_)
                | Error::InvalidInput(_)
                | Error::Payload(_) => StatusCode::BAD_REQUEST,
                Error::Database(_) | Error::Io(_) | Error::Config(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) | ApiError::Json(_) => "BadRequest",
            ApiError::Common(err) => err.code(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
