//! Transactional service layer
//!
//! `Library` binds the pure engine (selector, ordering, import) to the
//! database. Every logical operation runs inside a single transaction, and
//! entry mutations additionally hold the setlist's write lock, so the state
//! validated is the state committed.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use sqlx::SqlitePool;
use std::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{setlists, songs};
use crate::import::{self, ImportReport, ImportRow};
use crate::locks::SetlistLocks;
use crate::models::{Setlist, Song};
use crate::ordering::{self, Direction};
use crate::selector::{self, DEFAULT_TRIALS};
use crate::{Error, Result};

/// Takes the write lock up front, so reads inside the transaction cannot go
/// stale before its first write
const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

/// Cascade passes before a song that keeps being re-added is reported in use
const CASCADE_ROUNDS: usize = 8;

/// Parameters for creating a setlist
#[derive(Debug, Clone, Default)]
pub struct NewSetlist {
    pub name: String,
    pub description: Option<String>,
    pub target_duration: Option<u32>,
    /// Fill the setlist from the catalog with the quota selector
    pub generate: bool,
}

/// Result of a cascading song deletion
#[derive(Debug, Clone, Serialize)]
pub struct SongRemoval {
    pub song: Song,
    /// Setlists that lost an entry
    pub setlists: Vec<Uuid>,
}

/// Result of adding a song to a setlist
#[derive(Debug, Clone)]
pub struct AddedSong {
    pub entry_id: Uuid,
    /// One-based position of the new entry
    pub position: u32,
    pub setlist: Setlist,
}

pub struct Library {
    pool: SqlitePool,
    locks: SetlistLocks,
    trials: usize,
    rng: Mutex<StdRng>,
}

impl Library {
    pub fn new(pool: SqlitePool) -> Self {
        Self::with_trials(pool, DEFAULT_TRIALS)
    }

    /// Library seeded from OS entropy with a custom selector trial count
    pub fn with_trials(pool: SqlitePool, trials: usize) -> Self {
        Self::with_rng(pool, trials, StdRng::from_entropy())
    }

    /// Library with an explicit trial count and random source
    pub fn with_rng(pool: SqlitePool, trials: usize, rng: StdRng) -> Self {
        Self {
            pool,
            locks: SetlistLocks::new(),
            trials,
            rng: Mutex::new(rng),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn select(&self, songs: &[Song], target: Option<u32>) -> Vec<Song> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        selector::select(songs, target, self.trials, &mut *rng)
    }

    // ------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------

    pub async fn list_songs(&self) -> Result<Vec<Song>> {
        songs::list_songs(&self.pool).await
    }

    pub async fn get_song(&self, song_id: Uuid) -> Result<Song> {
        songs::get_song(&self.pool, song_id).await
    }

    pub async fn catalog_size(&self) -> Result<i64> {
        songs::count_songs(&self.pool).await
    }

    /// Add one song, validated like an import row
    pub async fn create_song(&self, row: &ImportRow) -> Result<Song> {
        let song = import::validate_row(row)?;
        let mut conn = self.pool.acquire().await?;
        songs::insert_song(&mut conn, &song).await?;
        info!("Added \"{}\" by {}", song.title, song.artist);
        Ok(song)
    }

    /// Validate a batch and commit every accepted song in one transaction.
    ///
    /// Catalog identities are read inside that transaction, so a song added
    /// concurrently shows up as a per-row duplicate.
    pub async fn import(&self, rows: &[ImportRow]) -> Result<ImportReport> {
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
        let existing = songs::identity_keys(&mut *tx).await?;
        let report = import::import(rows, &existing)?;
        if !report.accepted.is_empty() {
            songs::insert_songs(&mut tx, &report.accepted).await?;
        }
        tx.commit().await?;
        Ok(report)
    }

    /// Delete a song, first removing it from every setlist that holds it.
    ///
    /// Each affected setlist is updated in its own transaction through the
    /// ordering engine, so anchored encore breaks are handed on or dropped.
    /// The row itself is deleted only once no entry references it; a song
    /// placed again meanwhile triggers another cascade pass.
    pub async fn delete_song(&self, song_id: Uuid) -> Result<SongRemoval> {
        let song = songs::get_song(&self.pool, song_id).await?;
        let mut affected: Vec<Uuid> = Vec::new();

        for round in 0..CASCADE_ROUNDS {
            for setlist_id in songs::setlists_containing(&self.pool, song_id).await? {
                match self
                    .mutate_entries(setlist_id, |setlist| ordering::remove_song(setlist, song_id))
                    .await
                {
                    Ok((_, removed)) if removed > 0 && !affected.contains(&setlist_id) => {
                        affected.push(setlist_id);
                    }
                    Ok(_) | Err(Error::SetlistNotFound(_)) => {}
                    Err(e) => return Err(e),
                }
            }

            let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
            if songs::reference_count(&mut *tx, song_id).await? > 0 {
                debug!(round, song = %song_id, "song placed again during delete");
                tx.rollback().await?;
                continue;
            }
            songs::delete_song_row(&mut tx, song_id).await?;
            tx.commit().await?;

            info!(
                "Removed \"{}\" from the catalog and {} setlist(s)",
                song.title,
                affected.len()
            );
            return Ok(SongRemoval {
                song,
                setlists: affected,
            });
        }

        warn!("Giving up deleting {}: still being placed in setlists", song_id);
        Err(Error::SongInUse(song_id))
    }

    // ------------------------------------------------------------------
    // Setlists
    // ------------------------------------------------------------------

    pub async fn list_setlists(&self) -> Result<Vec<Setlist>> {
        setlists::list_setlists(&self.pool).await
    }

    pub async fn get_setlist(&self, setlist_id: Uuid) -> Result<Setlist> {
        let mut conn = self.pool.acquire().await?;
        setlists::load_setlist(&mut conn, setlist_id).await
    }

    /// Catalog songs not yet in the setlist
    pub async fn available_songs(&self, setlist_id: Uuid) -> Result<Vec<Song>> {
        self.get_setlist(setlist_id).await?;
        songs::list_songs_not_in_setlist(&self.pool, setlist_id).await
    }

    /// Create a setlist, optionally generated from the whole catalog
    pub async fn create_setlist(&self, request: NewSetlist) -> Result<Setlist> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(Error::MissingField("name".to_string()));
        }

        let selection = if request.generate {
            let catalog = songs::list_songs(&self.pool).await?;
            if catalog.is_empty() {
                return Err(Error::EmptyCatalog);
            }
            self.select(&catalog, request.target_duration)
        } else {
            Vec::new()
        };

        let mut setlist = ordering::build(name, selection, request.target_duration);
        setlist.description = request
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let mut tx = self.pool.begin().await?;
        setlists::insert_setlist(&mut tx, &setlist).await?;
        tx.commit().await?;

        info!(
            "Created setlist \"{}\" with {} songs ({}s)",
            setlist.name,
            setlist.song_count(),
            setlist.total_duration()
        );
        Ok(setlist)
    }

    pub async fn delete_setlist(&self, setlist_id: Uuid) -> Result<()> {
        let _guard = self.locks.lock(setlist_id).await;
        setlists::delete_setlist(&self.pool, setlist_id).await?;
        info!("Deleted setlist {}", setlist_id);
        Ok(())
    }

    /// Replace every entry with a fresh selection against the target.
    ///
    /// Fails with `RegenerateWithoutTarget` when the setlist has no target;
    /// the prior entries stay untouched on any failure.
    pub async fn regenerate(&self, setlist_id: Uuid) -> Result<Setlist> {
        let _guard = self.locks.lock(setlist_id).await;
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
        let mut setlist = setlists::load_setlist(&mut tx, setlist_id).await?;
        let Some(target) = setlist.target_duration else {
            warn!("Regenerate refused for {}: no target duration", setlist_id);
            return Err(Error::RegenerateWithoutTarget);
        };

        let catalog = songs::list_songs(&mut *tx).await?;
        let selection = self.select(&catalog, Some(target));
        *setlist.entries_mut() = ordering::build_entries(selection);

        setlists::replace_entries(&mut tx, &setlist).await?;
        tx.commit().await?;
        info!(
            "Regenerated \"{}\": {} songs, {}s of {}s",
            setlist.name,
            setlist.song_count(),
            setlist.total_duration(),
            target
        );
        Ok(setlist)
    }

    /// Load, mutate and rewrite a setlist's entries under its write lock in
    /// one transaction. A failing `op` rolls everything back.
    async fn mutate_entries<T, F>(&self, setlist_id: Uuid, op: F) -> Result<(Setlist, T)>
    where
        F: FnOnce(&mut Setlist) -> Result<T>,
    {
        let _guard = self.locks.lock(setlist_id).await;
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
        let mut setlist = setlists::load_setlist(&mut tx, setlist_id).await?;
        let value = op(&mut setlist)?;
        setlists::replace_entries(&mut tx, &setlist).await?;
        tx.commit().await?;
        Ok((setlist, value))
    }

    /// Apply a full song order; the order is validated against the state
    /// read inside the transaction, so a stale submission fails
    /// `OrderMismatch`.
    pub async fn reorder(&self, setlist_id: Uuid, new_order: &[Uuid]) -> Result<Setlist> {
        let (setlist, ()) = self
            .mutate_entries(setlist_id, |setlist| ordering::reorder(setlist, new_order))
            .await?;
        Ok(setlist)
    }

    pub async fn move_entry(
        &self,
        setlist_id: Uuid,
        entry_id: Uuid,
        direction: Direction,
    ) -> Result<Setlist> {
        let (setlist, ()) = self
            .mutate_entries(setlist_id, |setlist| {
                ordering::move_entry(setlist, entry_id, direction)
            })
            .await?;
        Ok(setlist)
    }

    pub async fn add_encore_break(&self, setlist_id: Uuid, after_entry_id: Uuid) -> Result<Setlist> {
        let (setlist, _) = self
            .mutate_entries(setlist_id, |setlist| {
                ordering::add_encore_break(setlist, after_entry_id)
            })
            .await?;
        Ok(setlist)
    }

    pub async fn remove_encore_break(&self, setlist_id: Uuid) -> Result<Setlist> {
        let (setlist, ()) = self
            .mutate_entries(setlist_id, ordering::remove_encore_break)
            .await?;
        Ok(setlist)
    }

    pub async fn remove_entry(&self, setlist_id: Uuid, entry_id: Uuid) -> Result<Setlist> {
        let (setlist, _) = self
            .mutate_entries(setlist_id, |setlist| ordering::remove_entry(setlist, entry_id))
            .await?;
        Ok(setlist)
    }

    /// Append a catalog song to the setlist
    pub async fn add_song(&self, setlist_id: Uuid, song_id: Uuid) -> Result<AddedSong> {
        let _guard = self.locks.lock(setlist_id).await;
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;
        let mut setlist = setlists::load_setlist(&mut tx, setlist_id).await?;
        let song = songs::get_song(&mut *tx, song_id).await?;
        let entry_id = ordering::add_song(&mut setlist, song)?;
        setlists::replace_entries(&mut tx, &setlist).await?;
        tx.commit().await?;

        // appended songs always land on the final position
        let position = setlist.entries().len() as u32;
        Ok(AddedSong {
            entry_id,
            position,
            setlist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use std::sync::Arc;
    use std::time::Duration;

    fn song_row(title: &str, duration: &str) -> ImportRow {
        [("title", title), ("artist", "Band"), ("duration", duration)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    async fn empty_setlist(library: &Library, name: &str) -> Uuid {
        library
            .create_setlist(NewSetlist {
                name: name.to_string(),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    async fn library() -> Library {
        let pool = init_memory_database().await.unwrap();
        Library::with_rng(pool, 64, StdRng::seed_from_u64(17))
    }

    #[tokio::test]
    async fn test_generate_requires_catalog() {
        let library = library().await;
        let err = library
            .create_setlist(NewSetlist {
                name: "Gig".to_string(),
                generate: true,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::EmptyCatalog));
        assert!(library.list_setlists().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let library = library().await;
        let err = library
            .create_setlist(NewSetlist {
                name: "  ".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingField(_)));
    }

    #[tokio::test]
    async fn test_delete_song_catches_song_placed_mid_cascade() {
        let library = Arc::new(library().await);
        let song: Song = library.create_song(&song_row("Song A", "3:00")).await.unwrap();
        let first = empty_setlist(&library, "First").await;
        let second = empty_setlist(&library, "Second").await;
        library.add_song(first, song.id).await.unwrap();

        // Park the cascade on the first setlist's lock
        let held = library.locks.lock(first).await;
        let deleting = tokio::spawn({
            let library = Arc::clone(&library);
            async move { library.delete_song(song.id).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        library.add_song(second, song.id).await.unwrap();
        drop(held);

        let removal = deleting.await.unwrap().unwrap();
        assert_eq!(removal.setlists, vec![first, second]);
        assert!(matches!(
            library.get_song(song.id).await,
            Err(Error::SongNotFound(_))
        ));
        assert_eq!(library.get_setlist(first).await.unwrap().song_count(), 0);
        assert_eq!(library.get_setlist(second).await.unwrap().song_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_setlist_ids_leave_no_lock_slots() {
        let library = library().await;
        for _ in 0..50 {
            let id = Uuid::new_v4();
            assert!(matches!(
                library.reorder(id, &[]).await,
                Err(Error::SetlistNotFound(_))
            ));
            assert!(matches!(
                library.remove_encore_break(id).await,
                Err(Error::SetlistNotFound(_))
            ));
            assert!(library.regenerate(id).await.is_err());
            assert!(library.delete_setlist(id).await.is_err());
        }
        assert_eq!(library.locks.slot_count(), 0);

        let id = empty_setlist(&library, "Kept").await;
        library.remove_entry(id, Uuid::new_v4()).await.unwrap_err();
        library.delete_setlist(id).await.unwrap();
        assert_eq!(library.locks.slot_count(), 0);
    }
}
