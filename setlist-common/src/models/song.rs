//! Catalog song records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::Error;

/// Performance tags a song can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Tag {
    Multitrack,
    Cover,
    VocalsOnly,
}

impl Tag {
    pub const ALL: [Tag; 3] = [Tag::Multitrack, Tag::Cover, Tag::VocalsOnly];

    /// Short code used in imports and printed setlists
    pub fn code(self) -> &'static str {
        match self {
            Tag::Multitrack => "M",
            Tag::Cover => "CVR",
            Tag::VocalsOnly => "VO",
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Tag::Multitrack => "Multitrack",
            Tag::Cover => "Cover",
            Tag::VocalsOnly => "Vocals Only",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Tag {
    type Err = Error;

    /// Parses a tag code; expects an already trimmed, upper-cased token
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tag::ALL
            .into_iter()
            .find(|tag| tag.code() == s)
            .ok_or_else(|| Error::UnknownTag(s.to_string()))
    }
}

/// A song in the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    /// Display override for `title` on printed setlists
    pub alias: Option<String>,
    #[serde(with = "crate::duration::hms")]
    pub duration_seconds: u32,
    pub genre: Option<String>,
    pub energy: Option<i64>,
    pub tags: BTreeSet<Tag>,
    pub play_count: u32,
    pub last_played: Option<DateTime<Utc>>,
}

impl Song {
    /// Create a song with a fresh id and no play history
    pub fn new(title: impl Into<String>, artist: impl Into<String>, duration_seconds: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            artist: artist.into(),
            alias: None,
            duration_seconds,
            genre: None,
            energy: None,
            tags: BTreeSet::new(),
            play_count: 0,
            last_played: None,
        }
    }

    /// Title as it should appear on a printed setlist
    pub fn print_title(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.title)
    }

    /// Tag codes joined for compact display, e.g. `"M, CVR"`
    pub fn tag_summary(&self) -> String {
        self.tags
            .iter()
            .map(|tag| tag.code())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Normalized (title, artist) identity used for duplicate detection
    pub fn identity_key(&self) -> String {
        identity_key(&self.title, &self.artist)
    }
}

/// Case-insensitive, whitespace-trimmed identity of a (title, artist) pair
pub fn identity_key(title: &str, artist: &str) -> String {
    format!(
        "{}\u{1f}{}",
        title.trim().to_lowercase(),
        artist.trim().to_lowercase()
    )
}
