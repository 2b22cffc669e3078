//! Persistent data model: catalog songs, setlists and their entries

pub mod setlist;
pub mod song;

pub use setlist::{
    Entry, EntryKind, Section, Setlist, SetlistSummary, BETWEEN_SONG_SECONDS,
    ENCORE_BREAK_SECONDS,
};
pub use song::{identity_key, Song, Tag};
