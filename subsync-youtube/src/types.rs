//! YouTube Data API v3 response types.
//!
//! Only the fields the engine reads are modelled.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use subsync_core::types::{CaptionId, VideoId};
use subsync_sync::{RemoteCaption, VideoSummary};

/// Any `*.list` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// `caption` resource.
///
/// See: https://developers.google.com/youtube/v3/docs/captions#resource
#[derive(Debug, Deserialize)]
pub struct Caption {
    pub id: String,
    #[serde(default)]
    pub snippet: CaptionSnippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSnippet {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_draft: bool,
}

impl From<Caption> for RemoteCaption {
    fn from(caption: Caption) -> Self {
        RemoteCaption {
            id: CaptionId::from(caption.id),
            language: caption.snippet.language,
            last_updated: caption.snippet.last_updated,
            is_draft: caption.snippet.is_draft,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Video {
    pub id: String,
    pub snippet: VideoSnippet,
}

#[derive(Debug, Deserialize)]
pub struct VideoSnippet {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub content_details: ChannelContentDetails,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
pub struct RelatedPlaylists {
    pub uploads: String,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistItem {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    #[serde(default)]
    pub title: String,
    pub resource_id: ResourceId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    pub video_id: String,
}

impl From<PlaylistItem> for VideoSummary {
    fn from(item: PlaylistItem) -> Self {
        VideoSummary {
            id: VideoId::from(item.snippet.resource_id.video_id),
            title: item.snippet.title,
        }
    }
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub errors: Vec<ErrorItem>,
}

#[derive(Debug, Deserialize)]
pub struct ErrorItem {
    #[serde(default)]
    pub reason: String,
}

impl ErrorEnvelope {
    /// `"<reason>: <message>"`, or whichever half is present.
    pub fn summary(&self) -> String {
        let reason = self
            .error
            .errors
            .first()
            .map(|e| e.reason.as_str())
            .unwrap_or("");
        match (reason.is_empty(), self.error.message.is_empty()) {
            (false, false) => format!("{reason}: {}", self.error.message),
            (false, true) => reason.to_string(),
            _ => self.error.message.clone(),
        }
    }
}
