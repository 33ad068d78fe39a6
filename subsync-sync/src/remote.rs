//! Remote caption service boundary.
//!
//! The wire client lives elsewhere (`subsync-youtube`); the engine only sees
//! this trait. Every call is blocking and carries a fixed quota cost, charged
//! by [`crate::session::RemoteSession`] when the call succeeds.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use subsync_core::types::{CaptionId, LanguageCode, VideoId};

/// A caption track as reported by the remote listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCaption {
    pub id: CaptionId,
    pub language: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_draft: bool,
}

/// One uploaded video of a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub id: VideoId,
    pub title: String,
}

/// Failure reported by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The service answered with a non-success status.
    #[error("HTTP {code}: {message}")]
    Status { code: u16, message: String },

    /// The request never produced a response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// No usable credentials.
    #[error("not authenticated: {0}")]
    Unauthenticated(String),
}

impl RemoteError {
    /// `true` for a 404-equivalent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, RemoteError::Status { code: 404, .. })
    }

    /// Credentials are missing, expired or rejected; retrying cannot help.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            RemoteError::Unauthenticated(_) | RemoteError::Status { code: 401, .. }
        )
    }
}

/// Operations the engine needs from the remote platform.
pub trait CaptionService {
    /// `captions.list` for one video.
    fn list_captions(&self, video_id: &VideoId) -> Result<Vec<RemoteCaption>, RemoteError>;

    /// `captions.insert`: create a new track from `file`.
    fn insert_caption(
        &self,
        video_id: &VideoId,
        language: &LanguageCode,
        file: &Path,
    ) -> Result<RemoteCaption, RemoteError>;

    /// `captions.update`: replace the body of an existing track.
    fn update_caption(
        &self,
        caption_id: &CaptionId,
        video_id: &VideoId,
        file: &Path,
    ) -> Result<RemoteCaption, RemoteError>;

    /// `captions.delete`.
    fn delete_caption(&self, caption_id: &CaptionId) -> Result<(), RemoteError>;

    /// `videos.list` title lookup; `Ok(None)` when the video does not exist.
    fn video_title(&self, video_id: &VideoId) -> Result<Option<String>, RemoteError>;

    /// All uploads of a channel. Returns the videos and the number of
    /// billable list requests it took (channel lookup + one per page).
    fn channel_videos(&self, channel_id: &str)
        -> Result<(Vec<VideoSummary>, u32), RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_404_is_not_found() {
        let not_found = RemoteError::Status {
            code: 404,
            message: "captionNotFound".into(),
        };
        let forbidden = RemoteError::Status {
            code: 403,
            message: "forbidden".into(),
        };
        assert!(not_found.is_not_found());
        assert!(!forbidden.is_not_found());
        assert!(!RemoteError::Transport("reset".into()).is_not_found());
    }

    #[test]
    fn auth_failures_are_recognized() {
        assert!(RemoteError::Unauthenticated("no token".into()).is_auth_failure());
        assert!(RemoteError::Status {
            code: 401,
            message: "expired".into()
        }
        .is_auth_failure());
        assert!(!RemoteError::Status {
            code: 500,
            message: "boom".into()
        }
        .is_auth_failure());
    }
}
