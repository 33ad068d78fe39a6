//! Sync pipeline for one project.
//!
//! lock → load → scan → reconcile → quota pre-flight → execute → apply
//! outcomes → save. Dry-run stops short of any remote call and never
//! saves. A quota refusal returns before anything is executed or saved.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use fs2::FileExt;

use subsync_core::types::{CaptionStatus, ProjectName, ProjectState, VideoId};
use subsync_core::{store, StoreError};

use crate::error::{io_err, ExecError, SyncError};
use crate::executor::{Executor, Outcome};
use crate::quota::{Confirm, QuotaMeter};
use crate::reconcile::{reconcile, Action, PairReport, Payload, ReconcileOptions};
use crate::remote::RemoteError;
use crate::scanner::{self, SkippedFile};
use crate::session::RemoteSession;

pub const LOCK_FILE: &str = ".sync.lock";

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
    pub allow_deletes: bool,
}

/// What happened to one planned action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionStatus {
    Applied(Outcome),
    Failed(String),
    /// Not attempted, e.g. because its video turned out to be missing.
    Skipped(String),
}

impl ActionStatus {
    pub fn is_failure(&self) -> bool {
        matches!(self, ActionStatus::Failed(_) | ActionStatus::Skipped(_))
    }
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionStatus::Applied(outcome) => outcome.fmt(f),
            ActionStatus::Failed(detail) => write!(f, "failed: {detail}"),
            ActionStatus::Skipped(detail) => write!(f, "skipped: {detail}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionReport {
    pub action: Action,
    pub status: ActionStatus,
}

/// Everything a caller needs to print the result of one sync.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub project: ProjectName,
    pub dry_run: bool,
    /// The user declined the quota prompt; nothing was executed or saved.
    pub aborted: bool,
    pub estimated_cost: u64,
    pub pairs: Vec<PairReport>,
    pub actions: Vec<ActionReport>,
    pub skipped_files: Vec<SkippedFile>,
}

impl SyncReport {
    pub fn failures(&self) -> usize {
        self.actions.iter().filter(|a| a.status.is_failure()).count()
    }

    pub fn applied(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| matches!(a.status, ActionStatus::Applied(_)))
            .count()
    }
}

/// Exclusive advisory lock on `<project>/.sync.lock`, released on drop.
#[derive(Debug)]
pub struct SyncLock {
    file: File,
    path: PathBuf,
}

impl SyncLock {
    /// Take the lock or fail immediately with [`SyncError::LockHeld`].
    pub fn acquire(project_dir: &Path) -> Result<Self, SyncError> {
        let path = project_dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| io_err(&path, e))?;
        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("acquired {}", path.display());
                Ok(Self { file, path })
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => Err(SyncError::LockHeld { path }),
            Err(err) if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(SyncError::LockHeld { path })
            }
            Err(err) => Err(io_err(&path, err)),
        }
    }
}

impl Drop for SyncLock {
    fn drop(&mut self) {
        if let Err(err) = self.file.unlock() {
            tracing::debug!("failed to unlock {}: {err}", self.path.display());
        }
    }
}

/// Synchronize one project under `home`.
///
/// Per-action failures are stamped on the pair's status and reported; the
/// rest of the plan still runs. An authentication failure stops the plan,
/// saves what already succeeded, and returns [`SyncError::Auth`].
pub fn sync_project_at(
    home: &Path,
    name: &ProjectName,
    session: &mut RemoteSession<'_>,
    opts: SyncOptions,
    confirm: &mut dyn Confirm,
) -> Result<SyncReport, SyncError> {
    let project_dir = store::project_dir_at(home, name);
    if !store::project_path_at(home, name).is_file() {
        return Err(StoreError::ProjectNotFound {
            path: store::project_path_at(home, name),
        }
        .into());
    }
    let _lock = SyncLock::acquire(&project_dir)?;

    let mut project = store::load_at(home, name)?;
    let scan = scanner::scan(&project_dir, &project)?;
    let plan = reconcile(
        &mut project,
        &scan,
        ReconcileOptions {
            allow_deletes: opts.allow_deletes,
        },
    );

    let mut report = SyncReport {
        project: name.clone(),
        dry_run: opts.dry_run,
        estimated_cost: QuotaMeter::estimate(plan.counts()),
        pairs: plan.pairs.clone(),
        skipped_files: scan.skipped.clone(),
        aborted: false,
        actions: Vec::new(),
    };
    for pair in plan.withheld_deletes() {
        tracing::info!(
            "{}/{} removed locally; pass --allow-deletes to delete it remotely",
            pair.video_id,
            pair.language
        );
    }

    if !opts.dry_run && !session.meter().preflight(plan.counts(), confirm) {
        report.aborted = true;
        return Ok(report);
    }

    let executor = Executor::new(opts.dry_run);
    let mut missing_videos: HashSet<VideoId> = HashSet::new();
    let mut halted: Option<RemoteError> = None;

    for action in plan.actions {
        let status = if let Some(err) = &halted {
            let detail = format!("stopped after authentication failure: {err}");
            stamp_error(&mut project.videos, &action, &detail);
            ActionStatus::Skipped(detail)
        } else if missing_videos.contains(&action.video_id) {
            let detail = format!("video {} not found", action.video_id);
            stamp_error(&mut project.videos, &action, &detail);
            ActionStatus::Skipped(detail)
        } else {
            match executor.execute(session, &action) {
                Ok(outcome) => {
                    if let Some(state) = project.videos.get_mut(&action.video_id) {
                        apply_outcome(state, &action, &outcome);
                    }
                    ActionStatus::Applied(outcome)
                }
                Err(err) => {
                    let detail = err.to_string();
                    tracing::error!("{action}: {detail}");
                    stamp_error(&mut project.videos, &action, &detail);
                    match err {
                        ExecError::VideoMissing { .. } => {
                            missing_videos.insert(action.video_id.clone());
                        }
                        ExecError::Remote(remote) if remote.is_auth_failure() => {
                            halted = Some(remote);
                        }
                        _ => {}
                    }
                    ActionStatus::Failed(detail)
                }
            }
        };
        report.actions.push(ActionReport { action, status });
    }

    if opts.dry_run {
        tracing::info!("[dry-run] {} left unchanged", name);
    } else {
        project.updated_at = Utc::now();
        store::save_at(home, &project)?;
        tracing::debug!("saved project '{name}'");
    }

    match halted {
        Some(err) => Err(SyncError::Auth(err)),
        None => Ok(report),
    }
}

/// Write a successful outcome back into the pair's record.
pub(crate) fn apply_outcome(state: &mut ProjectState, action: &Action, outcome: &Outcome) {
    match outcome {
        Outcome::DryRun => {}
        Outcome::Deleted { .. } => {
            state.captions.remove(&action.language);
        }
        Outcome::Uploaded(caption) | Outcome::Updated { caption, .. } => {
            let record = state.captions.entry(action.language.clone()).or_default();
            record.caption_id = Some(caption.id.clone());
            record.last_remote_update = caption.last_updated;
            record.is_draft = caption.is_draft;
            record.last_sync = Some(Utc::now());
            record.status = CaptionStatus::Synced;
            if let Payload::Upload { local_path } | Payload::Update { local_path, .. } =
                &action.payload
            {
                record.local_path = Some(local_path.clone());
            }
        }
    }
}

fn stamp_error(
    videos: &mut BTreeMap<VideoId, ProjectState>,
    action: &Action,
    detail: &str,
) {
    if let Some(record) = videos
        .get_mut(&action.video_id)
        .and_then(|state| state.captions.get_mut(&action.language))
    {
        record.status = CaptionStatus::Error(detail.to_string());
    }
}
