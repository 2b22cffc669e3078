//! Database initialization
//!
//! Opens (creating on first run) the SQLite database and makes sure every
//! table exists. Schema creation is idempotent and runs on each startup.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Open the database at `db_path`, creating file, parent folder and tables
/// as needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_schema(&pool).await?;
    Ok(pool)
}

/// Private in-memory database with the full schema.
///
/// Limited to a single connection: every `:memory:` connection would
/// otherwise see its own empty database.
pub async fn init_memory_database() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create all tables and indexes if they do not exist yet
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    create_songs_table(pool).await?;
    create_setlists_table(pool).await?;
    create_setlist_entries_table(pool).await?;
    Ok(())
}

async fn create_songs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS songs (
            guid TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            identity_key TEXT NOT NULL UNIQUE,
            alias TEXT,
            duration_seconds INTEGER NOT NULL CHECK (duration_seconds > 0),
            genre TEXT,
            energy INTEGER,
            is_multitrack INTEGER NOT NULL DEFAULT 0,
            is_cover INTEGER NOT NULL DEFAULT 0,
            is_vocals_only INTEGER NOT NULL DEFAULT 0,
            play_count INTEGER NOT NULL DEFAULT 0 CHECK (play_count >= 0),
            last_played_at TIMESTAMP,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_setlists_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS setlists (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            target_duration_seconds INTEGER CHECK (target_duration_seconds > 0),
            created_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Entries reference songs without ON DELETE CASCADE: song removal goes
/// through the ordering engine so encore breaks are re-anchored first.
async fn create_setlist_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS setlist_entries (
            guid TEXT PRIMARY KEY,
            setlist_id TEXT NOT NULL REFERENCES setlists(guid) ON DELETE CASCADE,
            kind TEXT NOT NULL CHECK (kind IN ('song', 'encore_break')),
            song_id TEXT REFERENCES songs(guid),
            position INTEGER NOT NULL CHECK (position > 0),
            CHECK ((kind = 'song') = (song_id IS NOT NULL)),
            UNIQUE (setlist_id, position)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_setlist_single_encore_break
         ON setlist_entries(setlist_id) WHERE kind = 'encore_break'",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_setlist_unique_song
         ON setlist_entries(setlist_id, song_id) WHERE song_id IS NOT NULL",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_setlist_entries_song ON setlist_entries(song_id)")
        .execute(pool)
        .await?;

    Ok(())
}
