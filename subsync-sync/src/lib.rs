//! # subsync-sync
//!
//! Caption reconciliation engine.
//!
//! [`scanner`] finds local subtitle files, [`reconcile`] diffs them against
//! the persisted project and plans actions, [`executor`] applies each action
//! through a metered, cached [`RemoteSession`]. [`pipeline::sync_project_at`]
//! ties these together for one project.

pub mod batch;
pub mod cache;
pub mod create;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod quota;
pub mod reconcile;
pub mod remote;
pub mod scanner;
pub mod session;

#[doc(hidden)]
pub mod testing;

pub use batch::{export_captions_csv, export_wide_report, process_batch, BatchOptions, BatchReport};
pub use cache::ResponseCache;
pub use create::{create_project_at, CreateReport, ProjectSource};
pub use error::{ExecError, SyncError};
pub use executor::{Executor, Outcome, UpdateStep};
pub use pipeline::{sync_project_at, ActionStatus, SyncOptions, SyncReport};
pub use quota::{AutoApprove, Confirm, QuotaMeter};
pub use reconcile::{reconcile, Action, ActionKind, ReconcileOptions, ReconcilePlan};
pub use remote::{CaptionService, RemoteCaption, RemoteError, VideoSummary};
pub use session::RemoteSession;
