//! Ordering engine
//!
//! In-memory operations over a setlist's entry sequence. Each operation
//! either succeeds and leaves positions contiguous (`1..=N`) with the encore
//! break still directly before its anchor song, or fails without touching
//! the sequence. Persistence wraps each call in a single transaction.

use std::collections::{HashMap, HashSet};
use tracing::debug;
use uuid::Uuid;

use crate::models::{Entry, Setlist, Song};
use crate::{Error, Result};

/// Direction for single-step moves
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

/// Reassign positions `1..=N` following the current sequence order
pub fn renumber(entries: &mut [Entry]) {
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.position = index as u32 + 1;
    }
}

/// Wrap a selection into contiguous song entries; no encore break is created
pub fn build_entries(selection: Vec<Song>) -> Vec<Entry> {
    let mut entries: Vec<Entry> = selection.into_iter().map(Entry::song).collect();
    renumber(&mut entries);
    entries
}

/// Build a new setlist from a selector result
pub fn build(name: impl Into<String>, selection: Vec<Song>, target: Option<u32>) -> Setlist {
    let mut setlist = Setlist::new(name, target);
    *setlist.entries_mut() = build_entries(selection);
    setlist
}

/// Id of the song entry the encore break is bound to, if any
fn encore_anchor(entries: &[Entry]) -> Option<Uuid> {
    let marker = entries.iter().position(Entry::is_encore_break)?;
    entries.get(marker + 1).map(|entry| entry.id)
}

/// Apply a new song order.
///
/// `new_order` must contain exactly the ids of the current song entries,
/// each once. The encore break is not part of the submission; it follows its
/// anchor song to the anchor's new place.
pub fn reorder(setlist: &mut Setlist, new_order: &[Uuid]) -> Result<()> {
    let current: HashSet<Uuid> = setlist
        .entries()
        .iter()
        .filter(|entry| !entry.is_encore_break())
        .map(|entry| entry.id)
        .collect();

    let mut submitted = HashSet::with_capacity(new_order.len());
    for id in new_order {
        if !submitted.insert(*id) {
            return Err(Error::OrderMismatch(format!("entry {} submitted twice", id)));
        }
        if !current.contains(id) {
            return Err(Error::OrderMismatch(format!("unknown entry {}", id)));
        }
    }
    if submitted.len() != current.len() {
        return Err(Error::OrderMismatch(format!(
            "expected {} entries, got {}",
            current.len(),
            submitted.len()
        )));
    }

    let anchor = encore_anchor(setlist.entries());
    let entries = setlist.entries_mut();
    let mut marker = None;
    let mut by_id: HashMap<Uuid, Entry> = HashMap::with_capacity(entries.len());
    for entry in entries.drain(..) {
        if entry.is_encore_break() {
            marker = Some(entry);
        } else {
            by_id.insert(entry.id, entry);
        }
    }

    for id in new_order {
        if Some(*id) == anchor {
            if let Some(marker) = marker.take() {
                entries.push(marker);
            }
        }
        if let Some(entry) = by_id.remove(id) {
            entries.push(entry);
        }
    }
    renumber(entries);
    debug!(setlist = %setlist.id, entries = setlist.entries().len(), "reordered");
    Ok(())
}

/// Insert an encore break directly after the given song entry.
///
/// The break binds to the song that follows, so the given entry must not be
/// the last one.
pub fn add_encore_break(setlist: &mut Setlist, after_entry_id: Uuid) -> Result<Uuid> {
    if setlist.encore_break().is_some() {
        return Err(Error::MarkerExists);
    }
    let index = setlist
        .entries()
        .iter()
        .position(|entry| entry.id == after_entry_id)
        .ok_or(Error::EntryNotFound(after_entry_id))?;
    if index + 1 >= setlist.entries().len() {
        return Err(Error::InvalidInput(
            "an encore break needs a song after it".to_string(),
        ));
    }

    let marker = Entry::encore_break();
    let marker_id = marker.id;
    let entries = setlist.entries_mut();
    entries.insert(index + 1, marker);
    renumber(entries);
    Ok(marker_id)
}

/// Remove the encore break; every song returns to the main section
pub fn remove_encore_break(setlist: &mut Setlist) -> Result<()> {
    let entries = setlist.entries_mut();
    let index = entries
        .iter()
        .position(Entry::is_encore_break)
        .ok_or_else(|| Error::InvalidInput("setlist has no encore break".to_string()))?;
    entries.remove(index);
    renumber(entries);
    Ok(())
}

/// Remove an entry.
///
/// Removing the anchor of the encore break hands the break to the next song,
/// or drops it when no song follows. Removing the break itself is the same as
/// [`remove_encore_break`].
pub fn remove_entry(setlist: &mut Setlist, entry_id: Uuid) -> Result<Entry> {
    let entries = setlist.entries_mut();
    let index = entries
        .iter()
        .position(|entry| entry.id == entry_id)
        .ok_or(Error::EntryNotFound(entry_id))?;

    let removed = entries.remove(index);
    if !removed.is_encore_break() && index > 0 && entries[index - 1].is_encore_break() {
        // the break now precedes whatever followed the removed song
        if entries.get(index).is_none() {
            entries.remove(index - 1);
        }
    }
    renumber(entries);
    Ok(removed)
}

/// Remove every entry referencing `song_id`; returns how many were removed
pub fn remove_song(setlist: &mut Setlist, song_id: Uuid) -> Result<usize> {
    let doomed: Vec<Uuid> = setlist
        .entries()
        .iter()
        .filter(|entry| entry.song_id() == Some(song_id))
        .map(|entry| entry.id)
        .collect();
    for entry_id in &doomed {
        remove_entry(setlist, *entry_id)?;
    }
    Ok(doomed.len())
}

/// Append a song at the final position (end of the open section)
pub fn add_song(setlist: &mut Setlist, song: Song) -> Result<Uuid> {
    if setlist.contains_song(song.id) {
        return Err(Error::DuplicateSong(format!(
            "\"{}\" by {} is already in {}",
            song.title, song.artist, setlist.name
        )));
    }
    let entry = Entry::song(song);
    let entry_id = entry.id;
    let entries = setlist.entries_mut();
    entries.push(entry);
    renumber(entries);
    Ok(entry_id)
}

/// Swap a song entry with its neighbouring song. No-op at either end.
pub fn move_entry(setlist: &mut Setlist, entry_id: Uuid, direction: Direction) -> Result<()> {
    let mut order: Vec<Uuid> = setlist
        .entries()
        .iter()
        .filter(|entry| !entry.is_encore_break())
        .map(|entry| entry.id)
        .collect();
    let index = order
        .iter()
        .position(|id| *id == entry_id)
        .ok_or(Error::EntryNotFound(entry_id))?;

    let neighbour = match direction {
        Direction::Up if index > 0 => index - 1,
        Direction::Down if index + 1 < order.len() => index + 1,
        _ => return Ok(()),
    };
    order.swap(index, neighbour);
    reorder(setlist, &order)
}
