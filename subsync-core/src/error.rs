//! Error types for subsync-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from project store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying I/O failure, annotated with the path involved.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization error (write/save path).
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// JSON parse error on load: includes the file path.
    #[error("failed to parse project file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.subsync/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// The project file did not exist at the expected path.
    #[error("project not found at {path}")]
    ProjectNotFound { path: PathBuf },

    /// `create` was asked to overwrite an existing project.
    #[error("project already exists at {path}")]
    ProjectExists { path: PathBuf },
}

/// Errors raised while resolving configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("channel '{nickname}' is not configured in {path}")]
    UnknownChannel { nickname: String, path: PathBuf },

    #[error("invalid channel id '{channel_id}' for '{nickname}': must start with 'UC'")]
    InvalidChannelId {
        nickname: String,
        channel_id: String,
    },

    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`StoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}
