//! Common error types for the setlist engine

use thiserror::Error;
use uuid::Uuid;

/// Common result type for setlist operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds shared by the catalog, the ordering engine and the service layer
///
/// Every domain failure is an expected outcome the caller renders as user
/// feedback. None of them leave partially written state behind.
#[derive(Error, Debug)]
pub enum Error {
    /// A required column was absent or blank
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Duration was neither `mm:ss` nor decimal minutes, or was not positive
    #[error("Invalid duration: {0:?}")]
    InvalidDuration(String),

    /// Energy was present but not an integer
    #[error("Invalid energy: {0:?}")]
    InvalidEnergy(String),

    /// Tag token outside of M, CVR, VO
    #[error("Unknown tag: {0:?}")]
    UnknownTag(String),

    /// Song already exists (catalog) or is already placed (setlist)
    #[error("Duplicate song: {0}")]
    DuplicateSong(String),

    /// Submitted order is not a permutation of the current song entries
    #[error("Order mismatch: {0}")]
    OrderMismatch(String),

    /// Setlist already carries an encore break
    #[error("Setlist already has an encore break")]
    MarkerExists,

    /// Song id not present in the catalog
    #[error("Song not found: {0}")]
    SongNotFound(Uuid),

    /// Song kept being placed in setlists while its deletion was running
    #[error("Song is still placed in a setlist: {0}")]
    SongInUse(Uuid),

    /// Setlist id not present
    #[error("Setlist not found: {0}")]
    SetlistNotFound(Uuid),

    /// Entry id not present in the setlist
    #[error("Entry not found: {0}")]
    EntryNotFound(Uuid),

    /// Regeneration requested on a setlist without a target duration
    #[error("Setlist has no target duration to regenerate against")]
    RegenerateWithoutTarget,

    /// Generation requested while the catalog holds no songs
    #[error("Catalog is empty")]
    EmptyCatalog,

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Import payload could not be decoded into rows
    #[error("Unreadable import payload: {0}")]
    Payload(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable code surfaced to callers
    pub fn code(&self) -> &'static str {
        match self {
            Error::MissingField(_) => "MissingField",
            Error::InvalidDuration(_) => "InvalidDuration",
            Error::InvalidEnergy(_) => "InvalidEnergy",
            Error::UnknownTag(_) => "UnknownTag",
            Error::DuplicateSong(_) => "DuplicateSong",
            Error::OrderMismatch(_) => "OrderMismatch",
            Error::MarkerExists => "MarkerExists",
            Error::SongNotFound(_) => "SongNotFound",
            Error::SongInUse(_) => "SongInUse",
            Error::SetlistNotFound(_) => "SetlistNotFound",
            Error::EntryNotFound(_) => "EntryNotFound",
            Error::RegenerateWithoutTarget => "RegenerateWithoutTarget",
            Error::EmptyCatalog => "EmptyCatalog",
            Error::InvalidInput(_) => "InvalidInput",
            Error::Payload(_) => "Payload",
            Error::Database(_) => "Database",
            Error::Io(_) => "Io",
            Error::Config(_) => "Config",
        }
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Payload(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Payload(err.to_string())
    }
}
