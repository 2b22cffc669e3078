//! Duration parsing and display
//!
//! Durations are stored as whole seconds. Input accepts either `mm:ss` or a
//! decimal number of minutes; output is always `hh:mm:ss` built from integer
//! division, so fractional seconds never appear.

use crate::{Error, Result};

/// Parse a user-supplied duration into whole seconds.
///
/// Accepted forms:
/// - `mm:ss` where `ss` is in `0..=59` (`"4:30"` → 270)
/// - decimal minutes (`"4.5"` → 270), rounded to the nearest second
///
/// The parsed value must be strictly positive.
///
/// # Examples
///
/// ```
/// use setlist_common::duration::parse_duration;
///
/// assert_eq!(parse_duration("4:30").unwrap(), 270);
/// assert_eq!(parse_duration("4.5").unwrap(), 270);
/// assert!(parse_duration("abc").is_err());
/// ```
pub fn parse_duration(raw: &str) -> Result<u32> {
    let value = raw.trim();
    let invalid = || Error::InvalidDuration(raw.to_string());

    let seconds = if let Some((minutes_part, seconds_part)) = value.split_once(':') {
        let minutes: u32 = minutes_part.trim().parse().map_err(|_| invalid())?;
        let seconds: u32 = seconds_part.trim().parse().map_err(|_| invalid())?;
        if seconds >= 60 {
            return Err(invalid());
        }
        minutes
            .checked_mul(60)
            .and_then(|m| m.checked_add(seconds))
            .ok_or_else(invalid)?
    } else {
        let minutes: f64 = value.parse().map_err(|_| invalid())?;
        if !minutes.is_finite() || minutes <= 0.0 {
            return Err(invalid());
        }
        let seconds = (minutes * 60.0).round();
        if seconds > f64::from(u32::MAX) {
            return Err(invalid());
        }
        seconds as u32
    };

    if seconds == 0 {
        return Err(invalid());
    }
    Ok(seconds)
}

/// Format seconds as `hh:mm:ss`.
///
/// ```
/// use setlist_common::duration::format_hms;
///
/// assert_eq!(format_hms(720), "00:12:00");
/// assert_eq!(format_hms(3661), "01:01:01");
/// ```
pub fn format_hms(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, secs)
}

/// Short `m:ss` label used next to individual songs
pub fn format_label(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Serde adapter writing seconds as `hh:mm:ss` and reading either that or
/// any form [`parse_duration`] accepts.
pub mod hms {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(seconds: &u32, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_hms(*seconds))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_hms(&raw).map_err(de::Error::custom)
    }
}

/// Optional variant of [`hms`]
pub mod hms_opt {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        seconds: &Option<u32>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match seconds {
            Some(s) => serializer.serialize_str(&super::format_hms(*s)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u32>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => super::parse_hms(value).map(Some).map_err(de::Error::custom),
        }
    }
}

/// Accept `hh:mm:ss` on top of the user-facing forms
pub fn parse_hms(raw: &str) -> Result<u32> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts.len() != 3 {
        return parse_duration(raw);
    }
    let invalid = || Error::InvalidDuration(raw.to_string());
    let hours: u32 = parts[0].parse().map_err(|_| invalid())?;
    let minutes: u32 = parts[1].parse().map_err(|_| invalid())?;
    let seconds: u32 = parts[2].parse().map_err(|_| invalid())?;
    if minutes >= 60 || seconds >= 60 {
        return Err(invalid());
    }
    let total = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .ok_or_else(invalid)?;
    if total == 0 {
        return Err(invalid());
    }
    Ok(total)
}
