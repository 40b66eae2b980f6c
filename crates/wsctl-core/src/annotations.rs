//! Session annotations: provenance and hibernation metadata.
//!
//! Annotations arrive as loosely-typed string metadata attached to session
//! records. Servers are inconsistent about representation: booleans may be
//! JSON booleans or the strings "true"/"false", timestamps may be empty
//! strings, counters may be quoted. Deserialization here is lenient so a
//! sloppy annotation never takes down session listing; anything unreadable
//! degrades to absent, which the unsaved-work rules treat as risk present.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

/// Provenance and hibernation metadata attached to a session record.
///
/// Annotations are the sole source of truth for hibernation provenance.
/// A missing `hibernation_date` on a hibernated session means the unsaved
/// work risk is unknown, which callers must treat as present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionAnnotations {
    /// Owning namespace
    #[serde(default)]
    pub namespace: String,

    /// Originating project slug
    #[serde(default)]
    pub project: String,

    /// Branch the session was launched from
    #[serde(default)]
    pub branch: String,

    /// Commit the session was launched at
    #[serde(default)]
    pub commit_sha: String,

    /// Resource class granted at launch or last modify
    #[serde(default)]
    pub resource_class_id: Option<String>,

    /// When the session was last hibernated; absent until first pause
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub hibernation_date: Option<DateTime<Utc>>,

    /// Branch recorded at hibernation time
    #[serde(default)]
    pub hibernation_branch: Option<String>,

    /// Commit recorded at hibernation time
    #[serde(default)]
    pub hibernation_commit_sha: Option<String>,

    /// Working tree had uncommitted files at hibernation time
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub hibernation_dirty: bool,

    /// All local commits were pushed at hibernation time
    #[serde(default, deserialize_with = "deserialize_flexible_bool")]
    pub hibernation_synchronized: bool,

    /// Seconds a hibernated filesystem is kept before reaping; 0 or
    /// absent means the platform never reaps it
    #[serde(default, deserialize_with = "deserialize_optional_seconds")]
    pub hibernated_seconds_threshold: Option<u64>,
}

impl SessionAnnotations {
    /// Returns true if a hibernation record exists.
    ///
    /// The date is the record's anchor field: without it the dirty and
    /// synchronized flags are meaningless.
    pub fn has_hibernation_record(&self) -> bool {
        self.hibernation_date.is_some()
    }

    /// Returns when a hibernated session's filesystem will be reaped.
    ///
    /// `None` when there is no hibernation record or the platform keeps
    /// the filesystem indefinitely (threshold absent or zero).
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let date = self.hibernation_date?;
        match self.hibernated_seconds_threshold {
            Some(secs) if secs > 0 => Some(date + Duration::seconds(secs as i64)),
            _ => None,
        }
    }
}

// ============================================================================
// Lenient Deserializers
// ============================================================================

/// Accepts an RFC 3339 timestamp, an empty string, or null.
///
/// Empty and unparseable strings map to `None`: hibernation metadata must
/// never fail a whole session record.
fn deserialize_optional_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|text| {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        match DateTime::parse_from_rfc3339(trimmed) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(error) => {
                debug!(value = %trimmed, %error, "Unparseable hibernation date, treating as absent");
                None
            }
        }
    }))
}

/// Accepts a JSON boolean or the strings "true"/"false" (any case).
///
/// Anything else, including null, maps to `false`.
fn deserialize_flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Flag(bool),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Flag(b) => b,
        Repr::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        Repr::Other(_) => false,
    })
}

/// Accepts a JSON integer or a quoted integer string.
///
/// Zero stays `Some(0)` so callers can distinguish "never reaped" from
/// "not reported"; both render the same way downstream.
fn deserialize_optional_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Seconds(u64),
        Text(String),
        Other(serde_json::Value),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Seconds(n)) => Some(n),
        Some(Repr::Text(s)) => s.trim().parse().ok(),
        Some(Repr::Other(_)) | None => None,
    })
}
