//! Bulk import pipeline
//!
//! Turns row-oriented song lists (CSV with a header row, or a JSON array of
//! objects) into validated catalog songs plus a per-row rejection report.
//! Validation never aborts the batch: every row ends up either accepted or
//! listed with the reason it was turned away.

use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};

use crate::duration::parse_duration;
use crate::models::{Song, Tag};
use crate::{Error, Result};

/// One raw row: normalized column name → raw cell text
pub type ImportRow = BTreeMap<String, String>;

/// Separators accepted between tag codes
const TAG_SEPARATORS: [char; 4] = [',', ';', '/', '|'];

/// Legacy boolean columns and the tag each one stands for
const LEGACY_TAG_COLUMNS: [(&str, Tag); 3] = [
    ("multitrack", Tag::Multitrack),
    ("cover", Tag::Cover),
    ("vocals_only", Tag::VocalsOnly),
];

/// Why a row was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RejectReason {
    MissingField,
    InvalidDuration,
    InvalidEnergy,
    UnknownTag,
    DuplicateSong,
}

impl RejectReason {
    fn from_error(err: &Error) -> Option<Self> {
        match err {
            Error::MissingField(_) => Some(RejectReason::MissingField),
            Error::InvalidDuration(_) => Some(RejectReason::InvalidDuration),
            Error::InvalidEnergy(_) => Some(RejectReason::InvalidEnergy),
            Error::UnknownTag(_) => Some(RejectReason::UnknownTag),
            Error::DuplicateSong(_) => Some(RejectReason::DuplicateSong),
            _ => None,
        }
    }
}

/// A rejected row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Zero-based index of the row within the submitted batch
    pub row: usize,
    pub reason: RejectReason,
    pub message: String,
}

/// Outcome of validating a batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportReport {
    pub accepted: Vec<Song>,
    pub rejected: Vec<Rejection>,
}

/// Normalize a header: trimmed, lower-case, inner spaces and dashes as `_`
pub fn normalize_column(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

fn field<'a>(row: &'a ImportRow, name: &str) -> Option<&'a str> {
    row.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn required<'a>(row: &'a ImportRow, name: &str) -> Result<&'a str> {
    field(row, name).ok_or_else(|| Error::MissingField(name.to_string()))
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "yes" | "1")
}

/// Split a tag cell into tags; every token must be a known code
pub fn parse_tags(raw: &str) -> Result<Vec<Tag>> {
    raw.split(|c: char| TAG_SEPARATORS.contains(&c))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| token.to_uppercase().parse::<Tag>())
        .collect()
}

/// Validate a single row into a song (field, duration, energy and tag
/// checks; duplicate detection is up to the caller).
pub fn validate_row(row: &ImportRow) -> Result<Song> {
    let title = required(row, "title")?;
    let artist = required(row, "artist")?;
    let duration_raw = required(row, "duration")?;

    let duration_seconds = parse_duration(duration_raw)?;

    let energy = match field(row, "energy") {
        Some(raw) => Some(
            raw.parse::<i64>()
                .map_err(|_| Error::InvalidEnergy(raw.to_string()))?,
        ),
        None => None,
    };

    let mut song = Song::new(title, artist, duration_seconds);
    song.energy = energy;
    song.alias = field(row, "alias").map(str::to_string);
    song.genre = field(row, "genre").map(str::to_string);

    if let Some(raw) = field(row, "tags") {
        song.tags.extend(parse_tags(raw)?);
    }
    for (column, tag) in LEGACY_TAG_COLUMNS {
        if field(row, column).is_some_and(is_truthy) {
            song.tags.insert(tag);
        }
    }

    Ok(song)
}

/// Validate a batch.
///
/// `existing` holds the identity keys already in the catalog; songs accepted
/// earlier in the same batch are checked as well. Only an error that is not
/// a row-level rejection fails the whole batch.
pub fn import(rows: &[ImportRow], existing: &HashSet<String>) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    let mut seen: HashSet<String> = HashSet::new();

    for (index, row) in rows.iter().enumerate() {
        let outcome = validate_row(row).and_then(|song| {
            let key = song.identity_key();
            if existing.contains(&key) || seen.contains(&key) {
                Err(Error::DuplicateSong(format!(
                    "\"{}\" by {}",
                    song.title, song.artist
                )))
            } else {
                seen.insert(key);
                Ok(song)
            }
        });

        match outcome {
            Ok(song) => report.accepted.push(song),
            Err(err) => {
                let Some(reason) = RejectReason::from_error(&err) else {
                    return Err(err);
                };
                debug!(row = index, ?reason, "import row rejected: {}", err);
                report.rejected.push(Rejection {
                    row: index,
                    reason,
                    message: err.to_string(),
                });
            }
        }
    }

    info!(
        accepted = report.accepted.len(),
        rejected = report.rejected.len(),
        "import batch validated"
    );
    Ok(report)
}

/// Decode CSV with a header row
pub fn rows_from_csv(data: &[u8]) -> Result<Vec<ImportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);
    let headers: Vec<String> = reader.headers()?.iter().map(normalize_column).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = headers
            .iter()
            .zip(record.iter())
            .map(|(column, value)| (column.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Decode a JSON array of flat objects
pub fn rows_from_json(data: &[u8]) -> Result<Vec<ImportRow>> {
    let objects: Vec<serde_json::Map<String, Value>> = serde_json::from_slice(data)?;
    Ok(objects.into_iter().map(row_from_object).collect())
}

/// Flatten one JSON object into a row. Numbers and booleans are taken as
/// their textual form, arrays of strings are joined as a tag list and nulls
/// are treated as absent.
pub fn row_from_object(object: serde_json::Map<String, Value>) -> ImportRow {
    object
        .into_iter()
        .filter_map(|(column, value)| {
            let text = match value {
                Value::Null => return None,
                Value::String(s) => s,
                Value::Array(items) => items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(","),
                other => other.to_string(),
            };
            Some((normalize_column(&column), text))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::identity_key;
    use std::collections::BTreeSet;

    fn row(pairs: &[(&str, &str)]) -> ImportRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_accepts_row_with_tags() {
        let rows = vec![row(&[
            ("title", "Song A"),
            ("artist", "Band X"),
            ("duration", "4:30"),
            ("tags", "M,CVR"),
        ])];
        let report = import(&rows, &HashSet::new()).unwrap();

        assert!(report.rejected.is_empty());
        let song = &report.accepted[0];
        assert_eq!(song.duration_seconds, 270);
        assert_eq!(
            song.tags,
            [Tag::Multitrack, Tag::Cover].into_iter().collect::<BTreeSet<_>>()
        );
    }

    #[test]
    fn test_duplicate_within_batch() {
        let rows = vec![
            row(&[("title", "Song A"), ("artist", "Band X"), ("duration", "4:30")]),
            row(&[("title", " song a "), ("artist", "BAND X"), ("duration", "3:00")]),
        ];
        let report = import(&rows, &HashSet::new()).unwrap();
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.rejected[0].row, 1);
        assert_eq!(report.rejected[0].reason, RejectReason::DuplicateSong);
    }

    #[test]
    fn test_duplicate_against_catalog() {
        let existing: HashSet<String> = [identity_key("Song A", "Band X")].into_iter().collect();
        let rows = vec![row(&[("title", "Song A"), ("artist", "Band X"), ("duration", "4:30")])];
        let report = import(&rows, &existing).unwrap();
        assert!(report.accepted.is_empty());
        assert_eq!(report.rejected[0].reason, RejectReason::DuplicateSong);
    }

    #[test]
    fn test_rejection_reasons_in_check_order() {
        let rows = vec![
            row(&[("title", "A"), ("artist", " "), ("duration", "abc")]),
            row(&[("title", "B"), ("artist", "X"), ("duration", "abc")]),
            row(&[("title", "C"), ("artist", "X"), ("duration", "3:00"), ("energy", "high")]),
            row(&[("title", "D"), ("artist", "X"), ("duration", "3:00"), ("tags", "M;XYZ")]),
            row(&[("title", "E"), ("artist", "X"), ("duration", "3:00"), ("energy", "7")]),
        ];
        let report = import(&rows, &HashSet::new()).unwrap();

        let reasons: Vec<_> = report.rejected.iter().map(|r| (r.row, r.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (0, RejectReason::MissingField),
                (1, RejectReason::InvalidDuration),
                (2, RejectReason::InvalidEnergy),
                (3, RejectReason::UnknownTag),
            ]
        );
        assert_eq!(report.accepted.len(), 1);
        assert_eq!(report.accepted[0].energy, Some(7));
    }

    #[test]
    fn test_only_row_errors_become_rejections() {
        assert_eq!(
            RejectReason::from_error(&Error::UnknownTag("X".to_string())),
            Some(RejectReason::UnknownTag)
        );
        assert_eq!(RejectReason::from_error(&Error::EmptyCatalog), None);
        assert_eq!(
            RejectReason::from_error(&Error::Payload("bad".to_string())),
            None
        );
    }

    #[test]
    fn test_tag_separators_and_case() {
        let tags = parse_tags(" m / vo| cvr ;").unwrap();
        assert_eq!(tags, vec![Tag::Multitrack, Tag::VocalsOnly, Tag::Cover]);
        assert!(parse_tags("").unwrap().is_empty());
    }

    #[test]
    fn test_legacy_boolean_columns() {
        let song = validate_row(&row(&[
            ("title", "A"),
            ("artist", "X"),
            ("duration", "2.5"),
            ("multitrack", "Yes"),
            ("cover", "0"),
            ("vocals_only", "TRUE"),
        ]))
        .unwrap();
        assert_eq!(song.duration_seconds, 150);
        assert!(song.has_tag(Tag::Multitrack));
        assert!(!song.has_tag(Tag::Cover));
        assert!(song.has_tag(Tag::VocalsOnly));
    }

    #[test]
    fn test_rows_from_csv() {
        let data = b"Title,Artist,Duration,Tags,Vocals Only\nSong A,Band X,4:30,\"M,CVR\",no\nSong B,Band Y,3.5,,yes\n";
        let rows = rows_from_csv(data).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["title"], "Song A");
        assert_eq!(rows[0]["tags"], "M,CVR");
        assert_eq!(rows[1]["vocals_only"], "yes");

        let report = import(&rows, &HashSet::new()).unwrap();
        assert_eq!(report.accepted.len(), 2);
        assert!(report.accepted[1].has_tag(Tag::VocalsOnly));
    }

    #[test]
    fn test_rows_from_json() {
        let data = br#"[{"title": "Song A", "artist": "Band X", "duration": 4.5, "energy": 3, "genre": null, "cover": true}]"#;
        let rows = rows_from_json(data).unwrap();
        assert_eq!(rows[0]["duration"], "4.5");
        assert!(!rows[0].contains_key("genre"));

        let song = validate_row(&rows[0]).unwrap();
        assert_eq!(song.duration_seconds, 270);
        assert_eq!(song.energy, Some(3));
        assert!(song.has_tag(Tag::Cover));
    }

    #[test]
    fn test_tag_array_joined() {
        let object = serde_json::json!({"Title": "A", "artist": "X", "duration": "3:00", "tags": ["M", "VO"]});
        let serde_json::Value::Object(object) = object else {
            unreachable!()
        };
        let song = validate_row(&row_from_object(object)).unwrap();
        assert!(song.has_tag(Tag::Multitrack));
        assert!(song.has_tag(Tag::VocalsOnly));
    }

    #[test]
    fn test_malformed_payload() {
        assert!(matches!(rows_from_json(b"{not json"), Err(Error::Payload(_))));
    }
}
