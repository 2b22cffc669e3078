//! Setlists and their positioned entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::song::Song;
use crate::{Error, Result};

/// Pause allowance charged for an encore break
pub const ENCORE_BREAK_SECONDS: u32 = 240;

/// Changeover allowance between two consecutive songs
pub const BETWEEN_SONG_SECONDS: u32 = 30;

/// What an entry places at its position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntryKind {
    Song { song: Song },
    /// Start of the encore section. Carries no song and is bound to the
    /// song entry directly after it.
    EncoreBreak,
}

/// One positioned element of a setlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Uuid,
    /// One-based position within the setlist
    pub position: u32,
    #[serde(flatten)]
    pub kind: EntryKind,
}

impl Entry {
    pub fn song(song: Song) -> Self {
        Self {
            id: Uuid::new_v4(),
            position: 0,
            kind: EntryKind::Song { song },
        }
    }

    pub fn encore_break() -> Self {
        Self {
            id: Uuid::new_v4(),
            position: 0,
            kind: EntryKind::EncoreBreak,
        }
    }

    pub fn as_song(&self) -> Option<&Song> {
        match &self.kind {
            EntryKind::Song { song } => Some(song),
            EntryKind::EncoreBreak => None,
        }
    }

    pub fn song_id(&self) -> Option<Uuid> {
        self.as_song().map(|song| song.id)
    }

    pub fn is_encore_break(&self) -> bool {
        matches!(self.kind, EntryKind::EncoreBreak)
    }
}

/// Section an entry's song belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Main,
    Encore,
}

/// An ordered performance plan
///
/// Entries are only reachable read-only from outside the crate; every
/// mutation goes through the ordering engine so positions and the encore
/// break stay consistent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Setlist {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    #[serde(with = "crate::duration::hms_opt")]
    pub target_duration: Option<u32>,
    pub created_at: DateTime<Utc>,
    entries: Vec<Entry>,
}

impl Setlist {
    /// Create an empty setlist
    pub fn new(name: impl Into<String>, target_duration: Option<u32>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            target_duration,
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }

    /// Rehydrate a setlist from stored rows (entries must already be ordered)
    pub(crate) fn from_parts(
        id: Uuid,
        name: String,
        description: Option<String>,
        target_duration: Option<u32>,
        created_at: DateTime<Utc>,
        entries: Vec<Entry>,
    ) -> Self {
        Self {
            id,
            name,
            description,
            target_duration,
            created_at,
            entries,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<Entry> {
        &mut self.entries
    }

    /// Song entries in order, markers skipped
    pub fn songs(&self) -> impl Iterator<Item = &Song> {
        self.entries.iter().filter_map(Entry::as_song)
    }

    pub fn contains_song(&self, song_id: Uuid) -> bool {
        self.songs().any(|song| song.id == song_id)
    }

    pub fn encore_break(&self) -> Option<&Entry> {
        self.entries.iter().find(|entry| entry.is_encore_break())
    }

    fn encore_break_index(&self) -> Option<usize> {
        self.entries.iter().position(Entry::is_encore_break)
    }

    /// Section of the entry at `index`
    pub fn section_of(&self, index: usize) -> Section {
        match self.encore_break_index() {
            Some(marker) if index > marker => Section::Encore,
            _ => Section::Main,
        }
    }

    fn section_duration(&self, section: Section) -> u32 {
        self.entries
            .iter()
            .enumerate()
            .filter(|(index, _)| self.section_of(*index) == section)
            .filter_map(|(_, entry)| entry.as_song())
            .map(|song| song.duration_seconds)
            .sum()
    }

    /// True iff at least one song sits in the encore section
    pub fn encore_enabled(&self) -> bool {
        (0..self.entries.len())
            .any(|index| self.section_of(index) == Section::Encore && self.entries[index].as_song().is_some())
    }

    pub fn song_count(&self) -> usize {
        self.songs().count()
    }

    pub fn main_set_duration(&self) -> u32 {
        self.section_duration(Section::Main)
    }

    pub fn encore_duration(&self) -> u32 {
        self.section_duration(Section::Encore)
    }

    pub fn encore_break_duration(&self) -> u32 {
        self.entries.iter().filter(|entry| entry.is_encore_break()).count() as u32
            * ENCORE_BREAK_SECONDS
    }

    /// Main set, encore break allowance and encore combined
    pub fn total_duration(&self) -> u32 {
        self.main_set_duration() + self.encore_break_duration() + self.encore_duration()
    }

    /// Changeover allowance between directly adjacent songs
    pub fn transition_buffer(&self) -> u32 {
        self.entries
            .windows(2)
            .filter(|pair| pair[0].as_song().is_some() && pair[1].as_song().is_some())
            .count() as u32
            * BETWEEN_SONG_SECONDS
    }

    /// Expected time on stage including changeovers
    pub fn planned_running_time(&self) -> u32 {
        self.total_duration() + self.transition_buffer()
    }

    pub fn summary(&self) -> SetlistSummary {
        SetlistSummary {
            song_count: self.song_count(),
            encore_enabled: self.encore_enabled(),
            main_set_duration: self.main_set_duration(),
            encore_break_duration: self.encore_break_duration(),
            encore_duration: self.encore_duration(),
            total_duration: self.total_duration(),
            transition_buffer: self.transition_buffer(),
            planned_running_time: self.planned_running_time(),
        }
    }

    /// Verify positions are `1..=N`, there is at most one encore break and
    /// the break is followed by a song.
    pub fn check_invariants(&self) -> Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.position as usize != index + 1 {
                return Err(Error::InvalidInput(format!(
                    "entry {} at index {} has position {}",
                    entry.id, index, entry.position
                )));
            }
        }

        let markers: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_encore_break())
            .map(|(index, _)| index)
            .collect();
        match markers.as_slice() {
            [] => Ok(()),
            [marker] => match self.entries.get(marker + 1) {
                Some(next) if next.as_song().is_some() => Ok(()),
                _ => Err(Error::InvalidInput(
                    "encore break is not followed by a song".to_string(),
                )),
            },
            _ => Err(Error::InvalidInput(format!(
                "{} encore breaks present",
                markers.len()
            ))),
        }
    }
}

/// Derived figures surfaced after every entry change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SetlistSummary {
    pub song_count: usize,
    pub encore_enabled: bool,
    #[serde(with = "crate::duration::hms")]
    pub main_set_duration: u32,
    #[serde(with = "crate::duration::hms")]
    pub encore_break_duration: u32,
    #[serde(with = "crate::duration::hms")]
    pub encore_duration: u32,
    #[serde(with = "crate::duration::hms")]
    pub total_duration: u32,
    #[serde(with = "crate::duration::hms")]
    pub transition_buffer: u32,
    #[serde(with = "crate::duration::hms")]
    pub planned_running_time: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::renumber;

    fn setlist_with(entries: Vec<Entry>) -> Setlist {
        let mut setlist = Setlist::new("Friday", None);
        *setlist.entries_mut() = entries;
        renumber(setlist.entries_mut());
        setlist
    }

    #[test]
    fn test_empty_setlist_aggregates() {
        let setlist = Setlist::new("Empty", Some(3600));
        let summary = setlist.summary();
        assert_eq!(summary.song_count, 0);
        assert!(!summary.encore_enabled);
        assert_eq!(summary.total_duration, 0);
        assert_eq!(summary.transition_buffer, 0);
        assert!(setlist.check_invariants().is_ok());
    }

    #[test]
    fn test_sections_split_on_encore_break() {
        let setlist = setlist_with(vec![
            Entry::song(Song::new("A", "X", 180)),
            Entry::song(Song::new("B", "X", 240)),
            Entry::encore_break(),
            Entry::song(Song::new("C", "X", 300)),
        ]);

        assert!(setlist.encore_enabled());
        assert_eq!(setlist.main_set_duration(), 420);
        assert_eq!(setlist.encore_break_duration(), ENCORE_BREAK_SECONDS);
        assert_eq!(setlist.encore_duration(), 300);
        assert_eq!(setlist.total_duration(), 420 + 240 + 300);
        assert_eq!(setlist.section_of(0), Section::Main);
        assert_eq!(setlist.section_of(3), Section::Encore);
    }

    #[test]
    fn test_transition_buffer_skips_encore_gap() {
        let setlist = setlist_with(vec![
            Entry::song(Song::new("A", "X", 60)),
            Entry::song(Song::new("B", "X", 60)),
            Entry::encore_break(),
            Entry::song(Song::new("C", "X", 60)),
            Entry::song(Song::new("D", "X", 60)),
        ]);
        assert_eq!(setlist.transition_buffer(), 2 * BETWEEN_SONG_SECONDS);
        assert_eq!(
            setlist.planned_running_time(),
            240 + ENCORE_BREAK_SECONDS + 2 * BETWEEN_SONG_SECONDS
        );
    }

    #[test]
    fn test_invariants_detect_dangling_marker() {
        let mut setlist = setlist_with(vec![Entry::song(Song::new("A", "X", 60))]);
        setlist.entries_mut().push(Entry::encore_break());
        renumber(setlist.entries_mut());
        assert!(setlist.check_invariants().is_err());
    }

    #[test]
    fn test_invariants_detect_position_gap() {
        let mut setlist = setlist_with(vec![
            Entry::song(Song::new("A", "X", 60)),
            Entry::song(Song::new("B", "X", 60)),
        ]);
        setlist.entries_mut()[1].position = 5;
        assert!(setlist.check_invariants().is_err());
    }

    #[test]
    fn test_summary_serializes_hms() {
        let setlist = setlist_with(vec![
            Entry::song(Song::new("A", "X", 180)),
            Entry::song(Song::new("B", "X", 240)),
            Entry::song(Song::new("C", "X", 300)),
        ]);
        let json = serde_json::to_value(setlist.summary()).unwrap();
        assert_eq!(json["total_duration"], "00:12:00");
        assert_eq!(json["song_count"], 3);
    }
}
