//! Error types for subsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use subsync_core::StoreError;

use crate::remote::RemoteError;

/// Errors fatal to a whole sync, create, or batch run.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Reading or writing the project file failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV read or write failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Another process is syncing the same project.
    #[error("another sync holds the lock at {path}")]
    LockHeld { path: PathBuf },

    /// The remote rejected our credentials; the plan was stopped.
    #[error("authentication failed: {0}")]
    Auth(RemoteError),

    /// A remote call that the operation cannot proceed without failed.
    #[error("remote error: {0}")]
    Remote(RemoteError),
}

/// Failure of a single action. Recorded against the pair, never fatal.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("local file not found: {path}")]
    MissingLocalFile { path: PathBuf },

    #[error("no caption id to delete for {video_id}/{language}")]
    MissingCaptionId { video_id: String, language: String },

    /// An upload was answered with 404: the video itself is gone.
    #[error("video {video_id} not found on the remote")]
    VideoMissing { video_id: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        if err.is_auth_failure() {
            SyncError::Auth(err)
        } else {
            SyncError::Remote(err)
        }
    }
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}
