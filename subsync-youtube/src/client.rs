//! YouTube Data API v3 connector.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use subsync_core::types::{CaptionId, LanguageCode, VideoId};
use subsync_sync::{CaptionService, RemoteCaption, RemoteError, VideoSummary};

use crate::types::{Caption, Channel, ErrorEnvelope, ListResponse, PlaylistItem, Video};

/// Environment variable holding the OAuth access token.
pub const TOKEN_ENV: &str = "SUBSYNC_ACCESS_TOKEN";

const API_BASE: &str = "https://www.googleapis.com/youtube/v3";
const UPLOAD_BASE: &str = "https://www.googleapis.com/upload/youtube/v3";

/// Maximum results per playlist page (API limit).
const PAGE_SIZE: &str = "50";

const BOUNDARY: &str = "subsync-caption-boundary-7d3f0a1c";

pub struct YouTubeClient {
    agent: ureq::Agent,
    token: Option<String>,
    api_base: String,
    upload_base: String,
}

impl YouTubeClient {
    /// Client sending `token` as a bearer credential. With `None` every
    /// call fails with [`RemoteError::Unauthenticated`].
    pub fn new(token: Option<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(60))
            .build();
        Self {
            agent,
            token: token.filter(|t| !t.trim().is_empty()),
            api_base: API_BASE.to_string(),
            upload_base: UPLOAD_BASE.to_string(),
        }
    }

    /// Token from [`TOKEN_ENV`].
    pub fn from_env() -> Self {
        Self::new(std::env::var(TOKEN_ENV).ok())
    }

    /// Point the client at another server (tests, proxies).
    pub fn with_base_urls(mut self, api: impl Into<String>, upload: impl Into<String>) -> Self {
        self.api_base = api.into();
        self.upload_base = upload.into();
        self
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn bearer(&self) -> Result<String, RemoteError> {
        self.token
            .as_ref()
            .map(|t| format!("Bearer {t}"))
            .ok_or_else(|| RemoteError::Unauthenticated(format!("{TOKEN_ENV} is not set")))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RemoteError> {
        let url = format!("{}/{resource}", self.api_base);
        tracing::debug!(%url, ?query, "GET");
        let mut request = self
            .agent
            .get(&url)
            .set("Authorization", &self.bearer()?)
            .set("Accept", "application/json");
        for (key, value) in query {
            request = request.query(key, value);
        }
        let response = request.call().map_err(map_error)?;
        response
            .into_json::<T>()
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn send_caption(
        &self,
        method: &str,
        metadata: &Value,
        file: &Path,
    ) -> Result<RemoteCaption, RemoteError> {
        let media = std::fs::read(file)
            .map_err(|e| RemoteError::Transport(format!("{}: {e}", file.display())))?;
        let body = multipart_body(metadata, &media);
        let url = format!("{}/captions", self.upload_base);
        tracing::debug!(%url, method, bytes = media.len(), "caption upload");
        let response = self
            .agent
            .request(method, &url)
            .set("Authorization", &self.bearer()?)
            .set(
                "Content-Type",
                &format!("multipart/related; boundary={BOUNDARY}"),
            )
            .query("part", "snippet")
            .query("uploadType", "multipart")
            .send_bytes(&body)
            .map_err(map_error)?;
        let caption: Caption = response
            .into_json()
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(caption.into())
    }
}

impl CaptionService for YouTubeClient {
    fn list_captions(&self, video_id: &VideoId) -> Result<Vec<RemoteCaption>, RemoteError> {
        let list: ListResponse<Caption> = self.get_json(
            "captions",
            &[("part", "snippet"), ("videoId", video_id.as_str())],
        )?;
        Ok(list.items.into_iter().map(Into::into).collect())
    }

    fn insert_caption(
        &self,
        video_id: &VideoId,
        language: &LanguageCode,
        file: &Path,
    ) -> Result<RemoteCaption, RemoteError> {
        let metadata = json!({
            "snippet": {
                "videoId": video_id.as_str(),
                "language": language.as_str(),
                "name": "",
                "isDraft": false,
            }
        });
        self.send_caption("POST", &metadata, file)
    }

    fn update_caption(
        &self,
        caption_id: &CaptionId,
        video_id: &VideoId,
        file: &Path,
    ) -> Result<RemoteCaption, RemoteError> {
        let metadata = json!({
            "id": caption_id.as_str(),
            "snippet": { "videoId": video_id.as_str(), "isDraft": false }
        });
        self.send_caption("PUT", &metadata, file)
    }

    fn delete_caption(&self, caption_id: &CaptionId) -> Result<(), RemoteError> {
        let url = format!("{}/captions", self.api_base);
        tracing::debug!(%url, caption = %caption_id, "DELETE");
        self.agent
            .delete(&url)
            .set("Authorization", &self.bearer()?)
            .query("id", caption_id.as_str())
            .call()
            .map_err(map_error)?;
        Ok(())
    }

    fn video_title(&self, video_id: &VideoId) -> Result<Option<String>, RemoteError> {
        let list: ListResponse<Video> =
            self.get_json("videos", &[("part", "snippet"), ("id", video_id.as_str())])?;
        Ok(list.items.into_iter().next().map(|v| v.snippet.title))
    }

    fn channel_videos(&self, channel_id: &str) -> Result<(Vec<VideoSummary>, u32), RemoteError> {
        let channels: ListResponse<Channel> = self.get_json(
            "channels",
            &[("part", "contentDetails"), ("id", channel_id)],
        )?;
        let uploads = channels
            .items
            .into_iter()
            .next()
            .map(|c| c.content_details.related_playlists.uploads)
            .ok_or_else(|| RemoteError::Status {
                code: 404,
                message: format!("channel {channel_id} not found"),
            })?;

        let mut requests = 1;
        let mut videos = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut query = vec![
                ("part", "snippet"),
                ("playlistId", uploads.as_str()),
                ("maxResults", PAGE_SIZE),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }
            let page: ListResponse<PlaylistItem> = self.get_json("playlistItems", &query)?;
            requests += 1;
            videos.extend(page.items.into_iter().map(VideoSummary::from));
            match page.next_page_token {
                Some(next) if !next.is_empty() => page_token = Some(next),
                _ => break,
            }
        }
        tracing::info!("found {} video(s) on channel {channel_id}", videos.len());
        Ok((videos, requests))
    }
}

/// `multipart/related` body: JSON metadata part, then the caption file.
pub(crate) fn multipart_body(metadata: &Value, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 512);
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata.to_string().as_bytes());
    body.extend_from_slice(format!("\r\n--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn map_error(err: ureq::Error) -> RemoteError {
    match err {
        ureq::Error::Status(code, response) => {
            let status_text = response.status_text().to_string();
            let body = response.into_string().unwrap_or_default();
            RemoteError::Status {
                code,
                message: status_message(&body, &status_text),
            }
        }
        ureq::Error::Transport(transport) => RemoteError::Transport(transport.to_string()),
    }
}

fn status_message(body: &str, status_text: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let summary = envelope.summary();
            if summary.is_empty() {
                status_text.to_string()
            } else {
                summary
            }
        }
        Err(_) => status_text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multipart_body_has_both_parts_in_order() {
        let metadata = json!({"snippet": {"videoId": "v1", "language": "en"}});
        let body = multipart_body(&metadata, b"1\n00:00:00,000 --> 00:00:01,000\nhi\n");
        let text = String::from_utf8(body).unwrap();

        let json_at = text.find("application/json").unwrap();
        let media_at = text.find("application/octet-stream").unwrap();
        assert!(json_at < media_at);
        assert!(text.contains(r#""videoId":"v1""#));
        assert!(text.contains("00:00:00,000 --> 00:00:01,000"));
        assert!(text.ends_with(&format!("--{BOUNDARY}--\r\n")));
        assert_eq!(text.matches(&format!("--{BOUNDARY}\r\n")).count(), 2);
    }

    #[test]
    fn status_message_falls_back_to_status_text() {
        assert_eq!(status_message("<html>oops</html>", "Bad Gateway"), "Bad Gateway");
        assert_eq!(
            status_message(
                r#"{"error": {"message": "Login Required", "errors": [{"reason": "required"}]}}"#,
                "Unauthorized"
            ),
            "required: Login Required"
        );
    }

    #[test]
    fn missing_token_fails_without_network() {
        let client = YouTubeClient::new(Some("  ".into()))
            .with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9");
        assert!(!client.has_token());
        let err = client.list_captions(&VideoId::from("v1")).unwrap_err();
        assert!(err.is_auth_failure());
    }

    #[test]
    fn upload_of_unreadable_file_is_a_local_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let client = YouTubeClient::new(Some("token".into()))
            .with_base_urls("http://127.0.0.1:9", "http://127.0.0.1:9");
        let err = client
            .insert_caption(
                &VideoId::from("v1"),
                &LanguageCode::new("en"),
                &tmp.path().join("absent.srt"),
            )
            .unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));
    }
}
