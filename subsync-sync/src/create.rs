//! Project creation from the remote's current state.

use std::path::{Path, PathBuf};

use subsync_core::types::{
    CaptionRecord, CaptionStatus, LanguageCode, ProjectFile, ProjectName, ProjectState, VideoId,
};
use subsync_core::{store, StoreError};

use crate::error::SyncError;
use crate::remote::VideoSummary;
use crate::session::RemoteSession;

/// Where a new project's videos come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectSource {
    /// Every upload of a channel (`UC…` id).
    Channel(String),
    /// An explicit list of videos.
    Videos(Vec<VideoId>),
}

#[derive(Debug, Clone)]
pub struct CreateReport {
    pub path: PathBuf,
    pub videos: usize,
    pub captions: usize,
    /// Videos whose captions could not be listed, with the reason.
    pub failed: Vec<(VideoId, String)>,
}

/// Create project `name` under `home`, seeded with one record per remote
/// caption. Records start `synced` with no `last_sync`, so the first sync
/// pushes any local file found for them.
pub fn create_project_at(
    home: &Path,
    name: &ProjectName,
    source: ProjectSource,
    session: &mut RemoteSession<'_>,
) -> Result<CreateReport, SyncError> {
    let path = store::project_path_at(home, name);
    if path.exists() {
        return Err(StoreError::ProjectExists { path }.into());
    }

    let (channel, videos) = match source {
        ProjectSource::Channel(channel_id) => {
            tracing::info!("fetching uploads of channel {channel_id}");
            let videos = session.channel_videos(&channel_id)?;
            (Some(channel_id), videos)
        }
        ProjectSource::Videos(ids) => {
            let mut videos = Vec::with_capacity(ids.len());
            for id in ids {
                let title = session.video_title(&id)?.unwrap_or_default();
                videos.push(VideoSummary { id, title });
            }
            (None, videos)
        }
    };

    let mut project = ProjectFile::new(name.clone(), channel);
    let mut failed = Vec::new();
    let mut captions = 0;
    let total = videos.len();

    for (i, video) in videos.into_iter().enumerate() {
        tracing::info!("[{}/{total}] {} {}", i + 1, video.id, video.title);
        let mut state = ProjectState::new(video.id.clone(), video.title);
        match session.list_captions(&video.id) {
            Ok(listed) => {
                for caption in listed {
                    let language = LanguageCode::new(&caption.language);
                    if state.captions.contains_key(&language) {
                        tracing::warn!(
                            "{}: more than one '{language}' caption; keeping the first",
                            video.id
                        );
                        continue;
                    }
                    state.captions.insert(
                        language,
                        CaptionRecord {
                            caption_id: Some(caption.id),
                            last_remote_update: caption.last_updated,
                            is_draft: caption.is_draft,
                            status: CaptionStatus::Synced,
                            ..CaptionRecord::default()
                        },
                    );
                    captions += 1;
                }
            }
            Err(err) => {
                tracing::warn!("could not list captions for {}: {err}", video.id);
                state.error = Some(err.to_string());
                failed.push((video.id.clone(), err.to_string()));
            }
        }
        project.videos.insert(video.id, state);
    }

    let path = store::create_at(home, &mut project)?;
    Ok(CreateReport {
        path,
        videos: project.videos.len(),
        captions,
        failed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ResponseCache;
    use crate::quota::QuotaMeter;
    use crate::remote::RemoteError;
    use crate::testing::FakeService;
    use chrono::Duration;
    use subsync_core::types::CaptionId;
    use tempfile::TempDir;

    #[test]
    fn channel_project_records_remote_captions() {
        let home = TempDir::new().unwrap();
        let cache = ResponseCache::new(home.path().join("cache"), Duration::hours(1));
        let service = FakeService::new()
            .with_channel("UCabc", &[("v1", "First"), ("v2", "Second")])
            .with_caption("v1", "c-en", "en")
            .with_caption("v1", "c-es", "es");
        service.fail_next(
            "list",
            RemoteError::Status {
                code: 403,
                message: "forbidden".into(),
            },
        );
        let mut meter = QuotaMeter::default();
        let mut session = RemoteSession::new(&service, &cache, &mut meter);

        let report = create_project_at(
            home.path(),
            &ProjectName::from("chan"),
            ProjectSource::Channel("UCabc".into()),
            &mut session,
        )
        .unwrap();

        // v1 is listed first and gets the injected failure.
        assert_eq!(report.videos, 2);
        assert_eq!(report.failed.len(), 1);
        let project = store::load_at(home.path(), &ProjectName::from("chan")).unwrap();
        assert_eq!(project.channel.as_deref(), Some("UCabc"));
        assert!(project.videos[&VideoId::from("v1")].error.is_some());
        assert!(store::project_dir_at(home.path(), &ProjectName::from("chan"))
            .join("v2")
            .is_dir());
    }

    #[test]
    fn video_project_normalizes_remote_languages() {
        let home = TempDir::new().unwrap();
        let cache = ResponseCache::new(home.path().join("cache"), Duration::hours(1));
        let service = FakeService::new()
            .with_title("v1", "Intro")
            .with_caption("v1", "c-es", "es");
        let mut meter = QuotaMeter::default();
        let mut session = RemoteSession::new(&service, &cache, &mut meter);

        let report = create_project_at(
            home.path(),
            &ProjectName::from("solo"),
            ProjectSource::Videos(vec![VideoId::from("v1")]),
            &mut session,
        )
        .unwrap();

        assert_eq!(report.captions, 1);
        let project = store::load_at(home.path(), &ProjectName::from("solo")).unwrap();
        let state = &project.videos[&VideoId::from("v1")];
        assert_eq!(state.title, "Intro");
        let record = &state.captions[&LanguageCode::new("es")];
        assert_eq!(record.caption_id, Some(CaptionId::from("c-es")));
        assert!(record.last_sync.is_none());
        // videos.list 1 + captions.list 50
        assert_eq!(meter.total_spent(), 51);
    }

    #[test]
    fn existing_project_is_refused_before_any_call() {
        let home = TempDir::new().unwrap();
        let mut existing = ProjectFile::new(ProjectName::from("dup"), None);
        store::create_at(home.path(), &mut existing).unwrap();
        let cache = ResponseCache::new(home.path().join("cache"), Duration::hours(1));
        let service = FakeService::new();
        let mut meter = QuotaMeter::default();
        let mut session = RemoteSession::new(&service, &cache, &mut meter);

        let err = create_project_at(
            home.path(),
            &ProjectName::from("dup"),
            ProjectSource::Videos(vec![VideoId::from("v1")]),
            &mut session,
        )
        .unwrap_err();

        assert!(matches!(err, SyncError::Store(StoreError::ProjectExists { .. })));
        assert!(service.calls().is_empty());
    }
}
