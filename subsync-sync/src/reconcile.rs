//! Reconciler: diffs local files against the persisted remote model and
//! emits the action plan.
//!
//! Classification per `(video, language)` pair:
//!
//! | local | record | rule                              | change     | action |
//! |-------|--------|-----------------------------------|------------|--------|
//! | yes   | no     |                                   | New        | upload |
//! | yes   | yes    | mtime > last_sync (or never synced) | Modified | update |
//! | yes   | yes    | otherwise                         | Unchanged  | none   |
//! | no    | yes    |                                   | Removed    | delete if allowed |
//!
//! The comparison uses `last_sync`, never the remote's own update time.
//! The reconciler never fails; it only classifies and stamps `status`.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use subsync_core::types::{
    CaptionId, CaptionRecord, CaptionStatus, LanguageCode, ProjectFile, VideoId,
};

use crate::quota::PlannedCounts;
use crate::scanner::LocalScan;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    New,
    Modified,
    Unchanged,
    Removed,
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Change::New => "new",
            Change::Modified => "modified",
            Change::Unchanged => "unchanged",
            Change::Removed => "removed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Upload,
    Update,
    Delete,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::Upload => "upload",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// What an action carries besides its target pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Upload {
        local_path: PathBuf,
    },
    Update {
        local_path: PathBuf,
        caption_id: Option<CaptionId>,
    },
    Delete {
        caption_id: Option<CaptionId>,
    },
}

/// One remote-mutating step of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub video_id: VideoId,
    pub language: LanguageCode,
    pub payload: Payload,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self.payload {
            Payload::Upload { .. } => ActionKind::Upload,
            Payload::Update { .. } => ActionKind::Update,
            Payload::Delete { .. } => ActionKind::Delete,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind(), self.video_id, self.language)?;
        match &self.payload {
            Payload::Upload { local_path } => write!(f, " from {}", local_path.display()),
            Payload::Update {
                local_path,
                caption_id,
            } => {
                write!(f, " from {}", local_path.display())?;
                match caption_id {
                    Some(id) => write!(f, " (caption {id})"),
                    None => write!(f, " (no caption id)"),
                }
            }
            Payload::Delete {
                caption_id: Some(id),
            } => write!(f, " (caption {id})"),
            Payload::Delete { caption_id: None } => Ok(()),
        }
    }
}

/// How one pair was classified and whether it produced an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairReport {
    pub video_id: VideoId,
    pub language: LanguageCode,
    pub change: Change,
    pub queued: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReconcileOptions {
    pub allow_deletes: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcilePlan {
    pub actions: Vec<Action>,
    pub pairs: Vec<PairReport>,
}

impl ReconcilePlan {
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn counts(&self) -> PlannedCounts {
        let mut counts = PlannedCounts::default();
        for action in &self.actions {
            match action.kind() {
                ActionKind::Upload => counts.uploads += 1,
                ActionKind::Update => counts.updates += 1,
                ActionKind::Delete => counts.deletes += 1,
            }
        }
        counts
    }

    /// Pairs found removed locally but held back because deletes are off.
    pub fn withheld_deletes(&self) -> impl Iterator<Item = &PairReport> {
        self.pairs
            .iter()
            .filter(|p| p.change == Change::Removed && !p.queued)
    }
}

/// Classify every pair of `project` against `scan`, stamp record statuses,
/// and return the plan. New local languages get a fresh record.
pub fn reconcile(
    project: &mut ProjectFile,
    scan: &LocalScan,
    opts: ReconcileOptions,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for (video_id, state) in project.videos.iter_mut() {
        let mut languages: BTreeSet<LanguageCode> = state.captions.keys().cloned().collect();
        languages.extend(
            scan.files
                .keys()
                .filter(|(v, _)| v == video_id)
                .map(|(_, l)| l.clone()),
        );

        for language in languages {
            let local = scan.get(video_id, &language);
            let (change, payload) = match (local, state.captions.get_mut(&language)) {
                (Some(file), None) => {
                    state
                        .captions
                        .insert(language.clone(), CaptionRecord::discovered(file.path.clone()));
                    (
                        Change::New,
                        Some(Payload::Upload {
                            local_path: file.path.clone(),
                        }),
                    )
                }
                (Some(file), Some(record)) => {
                    record.local_path = Some(file.path.clone());
                    let stale = match record.last_sync {
                        Some(last_sync) => file.modified > last_sync,
                        None => true,
                    };
                    if stale {
                        record.status = CaptionStatus::Modified;
                        (
                            Change::Modified,
                            Some(Payload::Update {
                                local_path: file.path.clone(),
                                caption_id: record.caption_id.clone(),
                            }),
                        )
                    } else {
                        record.status = CaptionStatus::Synced;
                        (Change::Unchanged, None)
                    }
                }
                (None, Some(record)) => {
                    record.status = CaptionStatus::Deleted;
                    let payload = opts.allow_deletes.then(|| Payload::Delete {
                        caption_id: record.caption_id.clone(),
                    });
                    (Change::Removed, payload)
                }
                (None, None) => continue,
            };

            tracing::debug!("{video_id}/{language}: {change}");
            plan.pairs.push(PairReport {
                video_id: video_id.clone(),
                language: language.clone(),
                change,
                queued: payload.is_some(),
            });
            if let Some(payload) = payload {
                plan.actions.push(Action {
                    video_id: video_id.clone(),
                    language,
                    payload,
                });
            }
        }
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{Convention, LocalFile};
    use chrono::{DateTime, TimeZone, Utc};
    use subsync_core::types::{ProjectName, ProjectState};

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn project_with(video: &str) -> ProjectFile {
        let mut project = ProjectFile::new(ProjectName::from("p"), None);
        project
            .videos
            .insert(VideoId::from(video), ProjectState::new(VideoId::from(video), "t"));
        project
    }

    fn record(caption_id: Option<&str>, last_sync: Option<DateTime<Utc>>) -> CaptionRecord {
        CaptionRecord {
            caption_id: caption_id.map(CaptionId::from),
            last_sync,
            ..CaptionRecord::default()
        }
    }

    fn local(scan: &mut LocalScan, video: &str, lang: &str, modified: DateTime<Utc>) {
        scan.files.insert(
            (VideoId::from(video), LanguageCode::new(lang)),
            LocalFile {
                path: PathBuf::from(format!("/p/{video}/{lang}.srt")),
                modified,
                convention: Convention::Nested,
            },
        );
    }

    fn state<'a>(project: &'a ProjectFile, video: &str) -> &'a ProjectState {
        &project.videos[&VideoId::from(video)]
    }

    #[test]
    fn new_local_file_plans_one_upload() {
        let mut project = project_with("video1");
        let mut scan = LocalScan::default();
        local(&mut scan, "video1", "en", ts(2023, 1, 1));

        let plan = reconcile(&mut project, &scan, ReconcileOptions::default());

        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].kind(), ActionKind::Upload);
        assert_eq!(plan.actions[0].language, LanguageCode::new("en"));
        let rec = &state(&project, "video1").captions[&LanguageCode::new("en")];
        assert_eq!(rec.status, CaptionStatus::New);
        assert!(rec.caption_id.is_none());
    }

    #[test]
    fn newer_local_file_plans_update_with_existing_id() {
        let mut project = project_with("video1");
        project.videos.get_mut(&VideoId::from("video1")).unwrap().captions.insert(
            LanguageCode::new("en"),
            record(Some("cap-1"), Some(ts(2023, 1, 1))),
        );
        let mut scan = LocalScan::default();
        local(&mut scan, "video1", "en", ts(2023, 1, 2));

        let plan = reconcile(&mut project, &scan, ReconcileOptions::default());

        assert_eq!(plan.actions.len(), 1);
        match &plan.actions[0].payload {
            Payload::Update { caption_id, .. } => {
                assert_eq!(caption_id.as_ref().map(|c| c.as_str()), Some("cap-1"))
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn never_synced_record_is_stale_even_without_caption_id() {
        let mut project = project_with("video1");
        project
            .videos
            .get_mut(&VideoId::from("video1"))
            .unwrap()
            .captions
            .insert(LanguageCode::new("en"), record(None, None));
        let mut scan = LocalScan::default();
        local(&mut scan, "video1", "en", ts(2000, 1, 1));

        let plan = reconcile(&mut project, &scan, ReconcileOptions::default());
        assert_eq!(
            plan.actions[0].payload,
            Payload::Update {
                local_path: PathBuf::from("/p/video1/en.srt"),
                caption_id: None
            }
        );
    }

    #[test]
    fn unchanged_files_plan_nothing() {
        let mut project = project_with("video1");
        project.videos.get_mut(&VideoId::from("video1")).unwrap().captions.insert(
            LanguageCode::new("en"),
            record(Some("cap-1"), Some(ts(2023, 1, 2))),
        );
        let mut scan = LocalScan::default();
        // Equal timestamps are not newer.
        local(&mut scan, "video1", "en", ts(2023, 1, 2));

        let plan = reconcile(&mut project, &scan, ReconcileOptions::default());
        assert!(plan.is_empty());
        assert_eq!(plan.pairs[0].change, Change::Unchanged);
        let rec = &state(&project, "video1").captions[&LanguageCode::new("en")];
        assert_eq!(rec.status, CaptionStatus::Synced);
    }

    #[test]
    fn removed_pair_is_reported_but_not_queued_without_allow_deletes() {
        let mut project = project_with("video1");
        project.videos.get_mut(&VideoId::from("video1")).unwrap().captions.insert(
            LanguageCode::new("es"),
            record(Some("cap-es"), Some(ts(2023, 1, 1))),
        );

        let plan = reconcile(&mut project, &LocalScan::default(), ReconcileOptions::default());

        assert!(plan.actions.is_empty());
        assert_eq!(plan.withheld_deletes().count(), 1);
        let rec = &state(&project, "video1").captions[&LanguageCode::new("es")];
        assert_eq!(rec.status, CaptionStatus::Deleted);
    }

    #[test]
    fn removed_pair_is_queued_with_allow_deletes() {
        let mut project = project_with("video1");
        project.videos.get_mut(&VideoId::from("video1")).unwrap().captions.insert(
            LanguageCode::new("es"),
            record(Some("cap-es"), Some(ts(2023, 1, 1))),
        );

        let plan = reconcile(
            &mut project,
            &LocalScan::default(),
            ReconcileOptions {
                allow_deletes: true,
            },
        );

        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].kind(), ActionKind::Delete);
        assert_eq!(plan.counts().deletes, 1);
        assert_eq!(plan.withheld_deletes().count(), 0);
    }

    #[test]
    fn counts_cover_every_kind() {
        let mut project = project_with("video1");
        let captions = &mut project.videos.get_mut(&VideoId::from("video1")).unwrap().captions;
        captions.insert(LanguageCode::new("de"), record(Some("d"), Some(ts(2023, 1, 1))));
        captions.insert(LanguageCode::new("fr"), record(Some("f"), Some(ts(2023, 1, 1))));
        let mut scan = LocalScan::default();
        local(&mut scan, "video1", "en", ts(2023, 1, 1));
        local(&mut scan, "video1", "de", ts(2023, 2, 1));

        let plan = reconcile(
            &mut project,
            &scan,
            ReconcileOptions {
                allow_deletes: true,
            },
        );
        assert_eq!(
            plan.counts(),
            PlannedCounts {
                uploads: 1,
                updates: 1,
                deletes: 1
            }
        );
    }

    #[test]
    fn other_videos_are_untouched() {
        let mut project = project_with("video1");
        project
            .videos
            .insert(VideoId::from("video2"), ProjectState::new(VideoId::from("video2"), ""));
        let mut scan = LocalScan::default();
        local(&mut scan, "video2", "en", ts(2023, 1, 1));

        let plan = reconcile(&mut project, &scan, ReconcileOptions::default());
        assert_eq!(plan.actions.len(), 1);
        assert_eq!(plan.actions[0].video_id, VideoId::from("video2"));
        assert!(state(&project, "video1").captions.is_empty());
    }
}
