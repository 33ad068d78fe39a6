//! subsync core library: domain types, project persistence, config, errors.
//!
//! - [`types`]: newtypes and the persisted project model
//! - [`language`]: caption language normalization and validation
//! - [`store`]: load / save / create project files
//! - [`config`]: user configuration (`~/.subsync/config.yaml`)
//! - [`error`]: [`StoreError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod language;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::{ConfigError, StoreError};
pub use types::{
    CaptionId, CaptionRecord, CaptionStatus, LanguageCode, ProjectFile, ProjectName,
    ProjectState, VideoId,
};
