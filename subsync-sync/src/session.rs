//! Metered, cached access to a [`CaptionService`].
//!
//! Every call that actually reaches the service and succeeds is charged to
//! the [`QuotaMeter`] exactly once. Read-only listings go through the
//! [`ResponseCache`]; once the session has mutated a video's captions, later
//! listings for that video skip the cache read and refresh the entry.

use std::collections::HashSet;
use std::path::Path;

use serde_json::json;

use subsync_core::types::{CaptionId, LanguageCode, VideoId};

use crate::cache::{fingerprint, ResponseCache};
use crate::quota::{ApiOperation, QuotaMeter};
use crate::remote::{CaptionService, RemoteCaption, RemoteError, VideoSummary};

pub struct RemoteSession<'a> {
    service: &'a dyn CaptionService,
    cache: &'a ResponseCache,
    meter: &'a mut QuotaMeter,
    touched: HashSet<VideoId>,
}

impl<'a> RemoteSession<'a> {
    pub fn new(
        service: &'a dyn CaptionService,
        cache: &'a ResponseCache,
        meter: &'a mut QuotaMeter,
    ) -> Self {
        Self {
            service,
            cache,
            meter,
            touched: HashSet::new(),
        }
    }

    pub fn meter(&self) -> &QuotaMeter {
        &*self.meter
    }

    pub fn list_captions(&mut self, video_id: &VideoId) -> Result<Vec<RemoteCaption>, RemoteError> {
        let key = fingerprint(
            ApiOperation::CaptionsList.name(),
            [("videoId", json!(video_id.as_str())), ("part", json!("snippet"))],
        );
        if !self.touched.contains(video_id) {
            if let Some(hit) = self.cache.get_typed::<Vec<RemoteCaption>>(&key) {
                tracing::debug!("captions for {video_id} served from cache");
                return Ok(hit);
            }
        }
        let captions = self.service.list_captions(video_id)?;
        self.meter.charge(ApiOperation::CaptionsList);
        self.cache.put_typed(&key, &captions);
        Ok(captions)
    }

    /// Treat any cached listing of `video_id` as outdated for the rest of
    /// the session.
    pub fn invalidate_listing(&mut self, video_id: &VideoId) {
        self.touched.insert(video_id.clone());
    }

    pub fn insert_caption(
        &mut self,
        video_id: &VideoId,
        language: &LanguageCode,
        file: &Path,
    ) -> Result<RemoteCaption, RemoteError> {
        let created = self.service.insert_caption(video_id, language, file)?;
        self.meter.charge(ApiOperation::CaptionsInsert);
        self.touched.insert(video_id.clone());
        Ok(created)
    }

    pub fn update_caption(
        &mut self,
        caption_id: &CaptionId,
        video_id: &VideoId,
        file: &Path,
    ) -> Result<RemoteCaption, RemoteError> {
        let updated = self.service.update_caption(caption_id, video_id, file)?;
        self.meter.charge(ApiOperation::CaptionsUpdate);
        self.touched.insert(video_id.clone());
        Ok(updated)
    }

    pub fn delete_caption(
        &mut self,
        video_id: &VideoId,
        caption_id: &CaptionId,
    ) -> Result<(), RemoteError> {
        self.service.delete_caption(caption_id)?;
        self.meter.charge(ApiOperation::CaptionsDelete);
        self.touched.insert(video_id.clone());
        Ok(())
    }

    pub fn video_title(&mut self, video_id: &VideoId) -> Result<Option<String>, RemoteError> {
        let key = fingerprint(
            ApiOperation::VideosList.name(),
            [("id", json!(video_id.as_str())), ("part", json!("snippet"))],
        );
        if let Some(hit) = self.cache.get_typed::<Option<String>>(&key) {
            return Ok(hit);
        }
        let title = self.service.video_title(video_id)?;
        self.meter.charge(ApiOperation::VideosList);
        self.cache.put_typed(&key, &title);
        Ok(title)
    }

    pub fn channel_videos(&mut self, channel_id: &str) -> Result<Vec<VideoSummary>, RemoteError> {
        let key = fingerprint(
            "channel.uploads",
            [("channelId", json!(channel_id))],
        );
        if let Some(hit) = self.cache.get_typed::<Vec<VideoSummary>>(&key) {
            tracing::info!("loaded {} video(s) for {channel_id} from cache", hit.len());
            return Ok(hit);
        }
        let (videos, requests) = self.service.channel_videos(channel_id)?;
        self.meter.charge(ApiOperation::ChannelsList);
        self.meter
            .charge_n(ApiOperation::PlaylistItemsList, requests.saturating_sub(1));
        self.cache.put_typed(&key, &videos);
        Ok(videos)
    }
}
