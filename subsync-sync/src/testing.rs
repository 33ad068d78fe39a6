//! In-memory [`CaptionService`] that records every call.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::path::Path;

use chrono::Utc;

use subsync_core::types::{CaptionId, LanguageCode, VideoId};

use crate::remote::{CaptionService, RemoteCaption, RemoteError, VideoSummary};

#[derive(Default)]
struct FakeState {
    captions: BTreeMap<String, Vec<RemoteCaption>>,
    titles: HashMap<String, String>,
    channels: HashMap<String, Vec<VideoSummary>>,
    missing_videos: HashSet<String>,
    failures: HashMap<&'static str, VecDeque<RemoteError>>,
    calls: Vec<String>,
    next_id: u32,
}

/// Fake remote. Operation names used by [`FakeService::calls_of`] and
/// [`FakeService::fail_next`]: `list`, `insert`, `update`, `delete`,
/// `title`, `channel`.
#[derive(Default)]
pub struct FakeService {
    state: RefCell<FakeState>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caption(self, video: &str, caption_id: &str, language: &str) -> Self {
        self.state
            .borrow_mut()
            .captions
            .entry(video.to_string())
            .or_default()
            .push(RemoteCaption {
                id: CaptionId::from(caption_id),
                language: language.to_string(),
                last_updated: Some(Utc::now()),
                is_draft: false,
            });
        self
    }

    pub fn with_title(self, video: &str, title: &str) -> Self {
        self.state
            .borrow_mut()
            .titles
            .insert(video.to_string(), title.to_string());
        self
    }

    pub fn with_channel(self, channel_id: &str, videos: &[(&str, &str)]) -> Self {
        let summaries = videos
            .iter()
            .map(|(id, title)| VideoSummary {
                id: VideoId::from(*id),
                title: title.to_string(),
            })
            .collect();
        self.state
            .borrow_mut()
            .channels
            .insert(channel_id.to_string(), summaries);
        self
    }

    /// Uploads and listings for `video` answer 404.
    pub fn with_missing_video(self, video: &str) -> Self {
        self.state
            .borrow_mut()
            .missing_videos
            .insert(video.to_string());
        self
    }

    /// Make the next call of `op` fail with `err`.
    pub fn fail_next(&self, op: &'static str, err: RemoteError) {
        self.state
            .borrow_mut()
            .failures
            .entry(op)
            .or_default()
            .push_back(err);
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    pub fn calls_of(&self, op: &str) -> usize {
        let prefix = format!("{op}:");
        self.state
            .borrow()
            .calls
            .iter()
            .filter(|c| c.starts_with(&prefix))
            .count()
    }

    /// Calls that would have changed remote state.
    pub fn mutation_calls(&self) -> usize {
        self.calls_of("insert") + self.calls_of("update") + self.calls_of("delete")
    }

    pub fn captions(&self, video: &str) -> Vec<RemoteCaption> {
        self.state
            .borrow()
            .captions
            .get(video)
            .cloned()
            .unwrap_or_default()
    }

    fn begin(&self, op: &'static str, detail: &str) -> Result<(), RemoteError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(format!("{op}:{detail}"));
        match state.failures.get_mut(op).and_then(|q| q.pop_front()) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn not_found(what: &str) -> RemoteError {
    RemoteError::Status {
        code: 404,
        message: format!("{what} not found"),
    }
}

impl CaptionService for FakeService {
    fn list_captions(&self, video_id: &VideoId) -> Result<Vec<RemoteCaption>, RemoteError> {
        self.begin("list", video_id.as_str())?;
        let state = self.state.borrow();
        if state.missing_videos.contains(video_id.as_str()) {
            return Err(not_found("video"));
        }
        Ok(state
            .captions
            .get(video_id.as_str())
            .cloned()
            .unwrap_or_default())
    }

    fn insert_caption(
        &self,
        video_id: &VideoId,
        language: &LanguageCode,
        file: &Path,
    ) -> Result<RemoteCaption, RemoteError> {
        self.begin("insert", &format!("{video_id}/{language}"))?;
        let mut state = self.state.borrow_mut();
        if state.missing_videos.contains(video_id.as_str()) {
            return Err(not_found("video"));
        }
        std::fs::metadata(file).map_err(|e| RemoteError::Transport(e.to_string()))?;
        state.next_id += 1;
        let caption = RemoteCaption {
            id: CaptionId::from(format!("cap-{}", state.next_id)),
            language: language.to_string(),
            last_updated: Some(Utc::now()),
            is_draft: false,
        };
        state
            .captions
            .entry(video_id.to_string())
            .or_default()
            .push(caption.clone());
        Ok(caption)
    }

    fn update_caption(
        &self,
        caption_id: &CaptionId,
        video_id: &VideoId,
        file: &Path,
    ) -> Result<RemoteCaption, RemoteError> {
        self.begin("update", caption_id.as_str())?;
        std::fs::metadata(file).map_err(|e| RemoteError::Transport(e.to_string()))?;
        let mut state = self.state.borrow_mut();
        let caption = state
            .captions
            .get_mut(video_id.as_str())
            .and_then(|list| list.iter_mut().find(|c| &c.id == caption_id))
            .ok_or_else(|| not_found("caption"))?;
        caption.last_updated = Some(Utc::now());
        Ok(caption.clone())
    }

    fn delete_caption(&self, caption_id: &CaptionId) -> Result<(), RemoteError> {
        self.begin("delete", caption_id.as_str())?;
        let mut state = self.state.borrow_mut();
        for list in state.captions.values_mut() {
            if let Some(pos) = list.iter().position(|c| &c.id == caption_id) {
                list.remove(pos);
                return Ok(());
            }
        }
        Err(not_found("caption"))
    }

    fn video_title(&self, video_id: &VideoId) -> Result<Option<String>, RemoteError> {
        self.begin("title", video_id.as_str())?;
        Ok(self.state.borrow().titles.get(video_id.as_str()).cloned())
    }

    fn channel_videos(
        &self,
        channel_id: &str,
    ) -> Result<(Vec<VideoSummary>, u32), RemoteError> {
        self.begin("channel", channel_id)?;
        let videos = self
            .state
            .borrow()
            .channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| not_found("channel"))?;
        let pages = (videos.len() as u32).div_ceil(50).max(1);
        Ok((videos, 1 + pages))
    }
}
