//! Setlist and entry persistence
//!
//! The entry sequence of a setlist is always written as a whole inside the
//! caller's transaction, so readers never observe a half-applied reorder.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use super::songs::{parse_guid, song_from_row, to_u32, SONG_COLUMNS};
use crate::models::{Entry, EntryKind, Setlist};
use crate::{Error, Result};

const KIND_SONG: &str = "song";
const KIND_ENCORE_BREAK: &str = "encore_break";

/// Insert the setlist row and its entries
pub async fn insert_setlist(conn: &mut SqliteConnection, setlist: &Setlist) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO setlists (guid, name, description, target_duration_seconds, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(setlist.id.to_string())
    .bind(&setlist.name)
    .bind(&setlist.description)
    .bind(setlist.target_duration.map(i64::from))
    .bind(setlist.created_at)
    .execute(&mut *conn)
    .await?;

    insert_entries(conn, setlist).await
}

async fn insert_entries(conn: &mut SqliteConnection, setlist: &Setlist) -> Result<()> {
    for entry in setlist.entries() {
        let (kind, song_id) = match &entry.kind {
            EntryKind::Song { song } => (KIND_SONG, Some(song.id.to_string())),
            EntryKind::EncoreBreak => (KIND_ENCORE_BREAK, None),
        };
        sqlx::query(
            "INSERT INTO setlist_entries (guid, setlist_id, kind, song_id, position)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(entry.id.to_string())
        .bind(setlist.id.to_string())
        .bind(kind)
        .bind(song_id)
        .bind(i64::from(entry.position))
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// Replace the stored entry sequence with the setlist's current entries
pub async fn replace_entries(conn: &mut SqliteConnection, setlist: &Setlist) -> Result<()> {
    sqlx::query("DELETE FROM setlist_entries WHERE setlist_id = ?")
        .bind(setlist.id.to_string())
        .execute(&mut *conn)
        .await?;
    insert_entries(conn, setlist).await?;
    debug!(setlist = %setlist.id, entries = setlist.entries().len(), "entries persisted");
    Ok(())
}

/// Load a setlist with its entries in position order
pub async fn load_setlist(conn: &mut SqliteConnection, setlist_id: Uuid) -> Result<Setlist> {
    let row = sqlx::query(
        "SELECT guid, name, description, target_duration_seconds, created_at
         FROM setlists WHERE guid = ?",
    )
    .bind(setlist_id.to_string())
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(Error::SetlistNotFound(setlist_id))?;

    let name: String = row.try_get("name")?;
    let description: Option<String> = row.try_get("description")?;
    let target: Option<i64> = row.try_get("target_duration_seconds")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;

    let sql = format!(
        "SELECT e.guid AS entry_guid, e.position AS entry_position, e.kind AS entry_kind,
                {SONG_COLUMNS}
         FROM setlist_entries e
         LEFT JOIN songs s ON s.guid = e.song_id
         WHERE e.setlist_id = ?
         ORDER BY e.position"
    );
    let rows = sqlx::query(&sql)
        .bind(setlist_id.to_string())
        .fetch_all(&mut *conn)
        .await?;

    let mut entries = Vec::with_capacity(rows.len());
    for row in &rows {
        let entry_guid: String = row.try_get("entry_guid")?;
        let position: i64 = row.try_get("entry_position")?;
        let kind: String = row.try_get("entry_kind")?;
        let kind = match kind.as_str() {
            KIND_ENCORE_BREAK => EntryKind::EncoreBreak,
            _ => EntryKind::Song {
                song: song_from_row(row)?,
            },
        };
        entries.push(Entry {
            id: parse_guid(&entry_guid)?,
            position: to_u32(position, "position")?,
            kind,
        });
    }

    let target = target
        .map(|t| to_u32(t, "target_duration_seconds"))
        .transpose()?;

    Ok(Setlist::from_parts(
        setlist_id,
        name,
        description,
        target,
        created_at,
        entries,
    ))
}

/// All setlists, newest first
pub async fn list_setlists(pool: &SqlitePool) -> Result<Vec<Setlist>> {
    let mut conn = pool.acquire().await?;
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT guid FROM setlists ORDER BY created_at DESC, name")
            .fetch_all(&mut *conn)
            .await?;

    let mut setlists = Vec::with_capacity(ids.len());
    for id in ids {
        setlists.push(load_setlist(&mut conn, parse_guid(&id)?).await?);
    }
    Ok(setlists)
}

/// Delete a setlist; its entries go with it
pub async fn delete_setlist(pool: &SqlitePool, setlist_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM setlists WHERE guid = ?")
        .bind(setlist_id.to_string())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::SetlistNotFound(setlist_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::init_memory_database;
    use crate::db::songs::insert_songs;
    use crate::models::Song;
    use crate::ordering::{add_encore_break, build};

    #[tokio::test]
    async fn test_setlist_round_trip_keeps_order_and_marker() {
        let pool = init_memory_database().await.unwrap();
        let songs = vec![
            Song::new("a", "X", 180),
            Song::new("b", "X", 240),
            Song::new("c", "X", 300),
        ];
        let mut conn = pool.acquire().await.unwrap();
        insert_songs(&mut conn, &songs).await.unwrap();

        let mut setlist = build("Gig", songs, Some(900));
        let first = setlist.entries()[0].id;
        add_encore_break(&mut setlist, first).unwrap();

        insert_setlist(&mut conn, &setlist).await.unwrap();
        let loaded = load_setlist(&mut conn, setlist.id).await.unwrap();

        assert_eq!(loaded.entries(), setlist.entries());
        assert_eq!(loaded.target_duration, Some(900));
        assert_eq!(loaded.summary(), setlist.summary());
        loaded.check_invariants().unwrap();
    }

    #[tokio::test]
    async fn test_delete_setlist_cascades_entries() {
        let pool = init_memory_database().await.unwrap();
        let songs = vec![Song::new("a", "X", 180)];
        let mut conn = pool.acquire().await.unwrap();
        insert_songs(&mut conn, &songs).await.unwrap();
        let setlist = build("Gig", songs, None);

        insert_setlist(&mut conn, &setlist).await.unwrap();
        drop(conn);

        delete_setlist(&pool, setlist.id).await.unwrap();
        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM setlist_entries")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, 0);
        assert!(matches!(
            delete_setlist(&pool, setlist.id).await,
            Err(Error::SetlistNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_out_of_range_position_is_a_decode_error() {
        let pool = init_memory_database().await.unwrap();
        let songs = vec![Song::new("a", "X", 180)];
        let mut conn = pool.acquire().await.unwrap();
        insert_songs(&mut conn, &songs).await.unwrap();
        let setlist = build("Gig", songs, None);
        insert_setlist(&mut conn, &setlist).await.unwrap();

        sqlx::query("UPDATE setlist_entries SET position = 5000000000")
            .execute(&mut *conn)
            .await
            .unwrap();
        let err = load_setlist(&mut conn, setlist.id).await.unwrap_err();
        assert!(matches!(err, Error::Database(sqlx::Error::Decode(_))));
    }
}
