//! Song catalog persistence

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, Row, Sqlite, SqliteConnection, SqlitePool};
use std::collections::{BTreeSet, HashSet};
use tracing::info;
use uuid::Uuid;

use crate::models::{Song, Tag};
use crate::{Error, Result};

/// Column list shared by every song query; joins alias the table as `s`
pub(crate) const SONG_COLUMNS: &str = "s.guid, s.title, s.artist, s.alias, s.duration_seconds, \
     s.genre, s.energy, s.is_multitrack, s.is_cover, s.is_vocals_only, s.play_count, \
     s.last_played_at";

pub(crate) fn parse_guid(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| Error::Database(sqlx::Error::Decode(Box::new(e))))
}

pub(crate) fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::Database(sqlx::Error::Decode(
            format!("{column} out of range: {value}").into(),
        ))
    })
}

/// Map a row selected with [`SONG_COLUMNS`]
pub(crate) fn song_from_row(row: &SqliteRow) -> Result<Song> {
    let guid: String = row.try_get("guid")?;
    let mut tags = BTreeSet::new();
    for (column, tag) in [
        ("is_multitrack", Tag::Multitrack),
        ("is_cover", Tag::Cover),
        ("is_vocals_only", Tag::VocalsOnly),
    ] {
        if row.try_get::<bool, _>(column)? {
            tags.insert(tag);
        }
    }

    Ok(Song {
        id: parse_guid(&guid)?,
        title: row.try_get("title")?,
        artist: row.try_get("artist")?,
        alias: row.try_get("alias")?,
        duration_seconds: to_u32(row.try_get("duration_seconds")?, "duration_seconds")?,
        genre: row.try_get("genre")?,
        energy: row.try_get("energy")?,
        tags,
        play_count: to_u32(row.try_get("play_count")?, "play_count")?,
        last_played: row.try_get::<Option<DateTime<Utc>>, _>("last_played_at")?,
    })
}

/// Insert a song; a clashing (title, artist) identity yields `DuplicateSong`
pub async fn insert_song(conn: &mut SqliteConnection, song: &Song) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO songs (
            guid, title, artist, identity_key, alias, duration_seconds, genre, energy,
            is_multitrack, is_cover, is_vocals_only, play_count, last_played_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(song.id.to_string())
    .bind(song.title.trim())
    .bind(song.artist.trim())
    .bind(song.identity_key())
    .bind(&song.alias)
    .bind(i64::from(song.duration_seconds))
    .bind(&song.genre)
    .bind(song.energy)
    .bind(song.has_tag(Tag::Multitrack))
    .bind(song.has_tag(Tag::Cover))
    .bind(song.has_tag(Tag::VocalsOnly))
    .bind(i64::from(song.play_count))
    .bind(song.last_played)
    .execute(conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
            Error::DuplicateSong(format!("\"{}\" by {}", song.title, song.artist)),
        ),
        Err(e) => Err(e.into()),
    }
}

/// Insert a batch of already validated songs on the caller's transaction
pub async fn insert_songs(conn: &mut SqliteConnection, songs: &[Song]) -> Result<()> {
    for song in songs {
        insert_song(&mut *conn, song).await?;
    }
    info!("Inserted {} songs into the catalog", songs.len());
    Ok(())
}

/// Load one song
pub async fn get_song<'c, E>(executor: E, song_id: Uuid) -> Result<Song>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("SELECT {SONG_COLUMNS} FROM songs s WHERE s.guid = ?");
    let row = sqlx::query(&sql)
        .bind(song_id.to_string())
        .fetch_optional(executor)
        .await?
        .ok_or(Error::SongNotFound(song_id))?;
    song_from_row(&row)
}

/// Whole catalog, ordered by title
pub async fn list_songs<'c, E>(executor: E) -> Result<Vec<Song>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let sql = format!("SELECT {SONG_COLUMNS} FROM songs s ORDER BY s.title COLLATE NOCASE, s.artist COLLATE NOCASE");
    let rows = sqlx::query(&sql).fetch_all(executor).await?;
    rows.iter().map(song_from_row).collect()
}

/// Catalog songs not yet placed in the given setlist
pub async fn list_songs_not_in_setlist(pool: &SqlitePool, setlist_id: Uuid) -> Result<Vec<Song>> {
    let sql = format!(
        "SELECT {SONG_COLUMNS} FROM songs s
         WHERE s.guid NOT IN (
             SELECT song_id FROM setlist_entries
             WHERE setlist_id = ? AND song_id IS NOT NULL
         )
         ORDER BY s.title COLLATE NOCASE, s.artist COLLATE NOCASE"
    );
    let rows = sqlx::query(&sql)
        .bind(setlist_id.to_string())
        .fetch_all(pool)
        .await?;
    rows.iter().map(song_from_row).collect()
}

/// Normalized (title, artist) identities of every catalog song
pub async fn identity_keys<'c, E>(executor: E) -> Result<HashSet<String>>
where
    E: Executor<'c, Database = Sqlite>,
{
    let keys: Vec<String> = sqlx::query_scalar("SELECT identity_key FROM songs")
        .fetch_all(executor)
        .await?;
    Ok(keys.into_iter().collect())
}

/// Setlists with at least one entry referencing the song
pub async fn setlists_containing(pool: &SqlitePool, song_id: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT setlist_id FROM setlist_entries WHERE song_id = ?",
    )
    .bind(song_id.to_string())
    .fetch_all(pool)
    .await?;
    ids.iter().map(|id| parse_guid(id)).collect()
}

/// Number of setlist entries referencing the song
pub async fn reference_count<'c, E>(executor: E, song_id: Uuid) -> Result<i64>
where
    E: Executor<'c, Database = Sqlite>,
{
    Ok(
        sqlx::query_scalar("SELECT COUNT(*) FROM setlist_entries WHERE song_id = ?")
            .bind(song_id.to_string())
            .fetch_one(executor)
            .await?,
    )
}

/// Delete the song row. Fails on the foreign key if entries still reference it.
pub async fn delete_song_row(conn: &mut SqliteConnection, song_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM songs WHERE guid = ?")
        .bind(song_id.to_string())
        .execute(conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::SongNotFound(song_id));
    }
    Ok(())
}

/// Catalog size, also queried by the health check
pub async fn count_songs(pool: &SqlitePool) -> Result<i64> {
    Ok(sqlx::query_scalar("SELECT COUNT(*) FROM songs")
        .fetch_one(pool)
        .await?)
}
