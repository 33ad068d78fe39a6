//! Domain types for subsync projects.
//!
//! All path fields use `PathBuf`; never `&str` or `String` for filesystem paths.
//! Everything here round-trips through serde + serde_json (`project.json`).

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::language;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }
    };
}

string_newtype!(
    /// Remote video identifier. Stable, never empty.
    VideoId
);

string_newtype!(
    /// Remote caption track identifier.
    CaptionId
);

string_newtype!(
    /// Name of a project directory under `~/.subsync/projects/`.
    ProjectName
);

/// A caption language code, normalized to the platform's regional variant.
///
/// Construct with [`LanguageCode::new`] so the key is normalized before it is
/// stored; `From<&str>` keeps the raw value (used for codes read back from
/// the remote, which are already canonical).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LanguageCode(pub String);

impl LanguageCode {
    /// Normalize `raw` (see [`language::normalize`]).
    pub fn new(raw: &str) -> Self {
        Self(language::normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against a remote-reported language.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for LanguageCode {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Caption status
// ---------------------------------------------------------------------------

/// Per-caption status, derived by the reconciler on every run and stamped
/// with an error detail by the executor.
///
/// Serialized as a single string (`"synced"`, `"error: <detail>"`, …).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum CaptionStatus {
    New,
    Modified,
    #[default]
    Synced,
    Deleted,
    Error(String),
}

impl CaptionStatus {
    pub fn is_error(&self) -> bool {
        matches!(self, CaptionStatus::Error(_))
    }
}

impl fmt::Display for CaptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptionStatus::New => write!(f, "new"),
            CaptionStatus::Modified => write!(f, "modified"),
            CaptionStatus::Synced => write!(f, "synced"),
            CaptionStatus::Deleted => write!(f, "deleted"),
            CaptionStatus::Error(detail) => write!(f, "error: {detail}"),
        }
    }
}

impl From<CaptionStatus> for String {
    fn from(status: CaptionStatus) -> Self {
        status.to_string()
    }
}

impl From<String> for CaptionStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "new" => CaptionStatus::New,
            "modified" => CaptionStatus::Modified,
            "synced" => CaptionStatus::Synced,
            "deleted" => CaptionStatus::Deleted,
            other => match other.strip_prefix("error") {
                Some(rest) => {
                    CaptionStatus::Error(rest.trim_start_matches(':').trim().to_string())
                }
                None => CaptionStatus::Error(format!("unrecognized status '{other}'")),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// One caption track of one video, as last known locally and remotely.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaptionRecord {
    /// `None` until the caption exists remotely.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub caption_id: Option<CaptionId>,
    /// Authoritative local file, recorded by the last scan that found it.
    #[serde(default, deserialize_with = "empty_string_as_none")]
    pub local_path: Option<PathBuf>,
    /// Remote's own last-modified timestamp for the track.
    #[serde(default, alias = "last_updated")]
    pub last_remote_update: Option<DateTime<Utc>>,
    /// When this record was last confirmed consistent with the remote.
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub status: CaptionStatus,
}

impl CaptionRecord {
    /// A record for a language just discovered on disk.
    pub fn discovered(local_path: PathBuf) -> Self {
        Self {
            local_path: Some(local_path),
            status: CaptionStatus::New,
            ..Self::default()
        }
    }
}

/// Root record for one video inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectState {
    pub subject_id: VideoId,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "subtitles")]
    pub captions: BTreeMap<LanguageCode, CaptionRecord>,
    /// Set when the video's captions could not be listed at creation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProjectState {
    pub fn new(subject_id: VideoId, title: impl Into<String>) -> Self {
        Self {
            subject_id,
            title: title.into(),
            captions: BTreeMap::new(),
            error: None,
        }
    }

    /// Re-key every caption under its normalized language code.
    ///
    /// When two keys collapse onto the same code the record with the later
    /// `last_sync` is kept. Returns one entry per dropped record, naming the
    /// code it collided on.
    pub fn normalize_languages(&mut self) -> Vec<LanguageCode> {
        let mut dropped = Vec::new();
        let original = std::mem::take(&mut self.captions);
        for (code, record) in original {
            let normalized = LanguageCode::new(code.as_str());
            match self.captions.get(&normalized) {
                Some(existing) if existing.last_sync >= record.last_sync => {
                    dropped.push(normalized);
                }
                Some(_) => {
                    dropped.push(normalized.clone());
                    self.captions.insert(normalized, record);
                }
                None => {
                    self.captions.insert(normalized, record);
                }
            }
        }
        dropped
    }
}

/// The on-disk project document (`project.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    pub name: ProjectName,
    /// Channel the project was created from, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub videos: BTreeMap<VideoId, ProjectState>,
}

impl ProjectFile {
    pub fn new(name: ProjectName, channel: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            name,
            channel,
            created_at: now,
            updated_at: now,
            videos: BTreeMap::new(),
        }
    }

    pub fn contains_video(&self, video_id: &str) -> bool {
        self.videos.contains_key(&VideoId::from(video_id))
    }
}

fn empty_string_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(T::from))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn newtype_display() {
        assert_eq!(VideoId::from("abc").to_string(), "abc");
        assert_eq!(ProjectName::from("launch").to_string(), "launch");
        assert_eq!(LanguageCode::new("ES").to_string(), "es-US");
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            CaptionStatus::New,
            CaptionStatus::Modified,
            CaptionStatus::Synced,
            CaptionStatus::Deleted,
            CaptionStatus::Error("quota exceeded".to_string()),
        ] {
            let back = CaptionStatus::from(String::from(status.clone()));
            assert_eq!(back, status);
        }
    }

    #[test]
    fn legacy_record_fields_are_accepted() {
        let json = r#"{
            "caption_id": "cap1",
            "last_updated": "2023-01-01T00:00:00Z",
            "is_draft": false,
            "local_path": "",
            "last_sync": null,
            "status": "synced"
        }"#;
        let record: CaptionRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.caption_id, Some(CaptionId::from("cap1")));
        assert!(record.local_path.is_none());
        assert!(record.last_remote_update.is_some());
        assert!(record.last_sync.is_none());
    }

    #[test]
    fn subtitles_alias_populates_captions() {
        let json = r#"{"subject_id":"v1","title":"T","subtitles":{"en":{"status":"synced"}}}"#;
        let state: ProjectState = serde_json::from_str(json).unwrap();
        assert!(state.captions.contains_key(&LanguageCode::from("en")));
    }

    #[test]
    fn normalize_languages_keeps_latest_sync_on_collision() {
        let mut state = ProjectState::new(VideoId::from("v1"), "T");
        let older = Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        state.captions.insert(
            LanguageCode::from("es"),
            CaptionRecord {
                caption_id: Some(CaptionId::from("old")),
                last_sync: Some(older),
                ..CaptionRecord::default()
            },
        );
        state.captions.insert(
            LanguageCode::from("es-US"),
            CaptionRecord {
                caption_id: Some(CaptionId::from("new")),
                last_sync: Some(newer),
                ..CaptionRecord::default()
            },
        );

        let dropped = state.normalize_languages();
        assert_eq!(dropped.len(), 1);
        assert_eq!(state.captions.len(), 1);
        let kept = &state.captions[&LanguageCode::from("es-US")];
        assert_eq!(kept.caption_id, Some(CaptionId::from("new")));
    }
}
