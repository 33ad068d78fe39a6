//! Action executor.
//!
//! Applies one planned action through a [`RemoteSession`]. Updates walk an
//! ordered fallback chain, see [`UpdateStep`]. Dry-run returns right after
//! logging intent, before any file check, network call or quota charge.

use std::fmt;
use std::path::Path;

use subsync_core::language;
use subsync_core::types::{CaptionId, LanguageCode, VideoId};

use crate::error::ExecError;
use crate::reconcile::{Action, Payload};
use crate::remote::RemoteCaption;
use crate::session::RemoteSession;

/// Stages of the update fallback chain, tried in order:
///
/// 1. `ById`: update the recorded caption id directly. A 404 for that id
///    moves on; any other failure is returned as is.
/// 2. `ByLanguage`: list the video's captions and update the first track
///    whose language matches. No match moves on.
/// 3. `FreshUpload`: insert a new track. Terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateStep {
    ById(CaptionId),
    ByLanguage,
    FreshUpload,
}

impl UpdateStep {
    /// First step for an update carrying `caption_id`. Empty ids count as
    /// absent.
    pub fn start(caption_id: Option<&CaptionId>) -> Self {
        match caption_id {
            Some(id) if !id.as_str().trim().is_empty() => UpdateStep::ById(id.clone()),
            _ => UpdateStep::ByLanguage,
        }
    }

    /// Step to try when this one found nothing to update.
    pub fn fallback(&self) -> UpdateStep {
        match self {
            UpdateStep::ById(_) => UpdateStep::ByLanguage,
            UpdateStep::ByLanguage | UpdateStep::FreshUpload => UpdateStep::FreshUpload,
        }
    }
}

impl fmt::Display for UpdateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStep::ById(id) => write!(f, "by id {id}"),
            UpdateStep::ByLanguage => f.write_str("by language"),
            UpdateStep::FreshUpload => f.write_str("as fresh upload"),
        }
    }
}

/// Result of one successfully applied action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Uploaded(RemoteCaption),
    Updated {
        caption: RemoteCaption,
        via: UpdateStep,
    },
    /// `remote` is false when there was no caption id, so only the local
    /// record goes away.
    Deleted { remote: bool },
    DryRun,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Uploaded(c) => write!(f, "uploaded as {}", c.id),
            Outcome::Updated { caption, via } => write!(f, "updated {} ({via})", caption.id),
            Outcome::Deleted { remote: true } => f.write_str("deleted"),
            Outcome::Deleted { remote: false } => f.write_str("removed from project"),
            Outcome::DryRun => f.write_str("skipped (dry run)"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Executor {
    dry_run: bool,
}

impl Executor {
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    pub fn execute(
        &self,
        session: &mut RemoteSession<'_>,
        action: &Action,
    ) -> Result<Outcome, ExecError> {
        if self.dry_run {
            tracing::info!("[dry-run] would {action}");
            return Ok(Outcome::DryRun);
        }
        tracing::info!("{action}");

        match &action.payload {
            Payload::Upload { local_path } => {
                require_file(local_path)?;
                self.upload(session, &action.video_id, &action.language, local_path)
                    .map(Outcome::Uploaded)
            }
            Payload::Update {
                local_path,
                caption_id,
            } => {
                require_file(local_path)?;
                self.update(
                    session,
                    &action.video_id,
                    &action.language,
                    caption_id.as_ref(),
                    local_path,
                )
            }
            Payload::Delete { caption_id } => {
                let Some(caption_id) = caption_id else {
                    tracing::debug!(
                        "{}/{} has no caption id; dropping the record only",
                        action.video_id,
                        action.language
                    );
                    return Ok(Outcome::Deleted { remote: false });
                };
                match session.delete_caption(&action.video_id, caption_id) {
                    Ok(()) => Ok(Outcome::Deleted { remote: true }),
                    Err(err) if err.is_not_found() => {
                        tracing::warn!("caption {caption_id} was already gone remotely");
                        Ok(Outcome::Deleted { remote: true })
                    }
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    fn upload(
        &self,
        session: &mut RemoteSession<'_>,
        video_id: &VideoId,
        language: &LanguageCode,
        file: &Path,
    ) -> Result<RemoteCaption, ExecError> {
        if !language::is_recognized(language.as_str()) {
            tracing::warn!("language '{language}' is not a recognized caption language; uploading anyway");
        }
        session
            .insert_caption(video_id, language, file)
            .map_err(|err| {
                if err.is_not_found() {
                    ExecError::VideoMissing {
                        video_id: video_id.to_string(),
                    }
                } else {
                    err.into()
                }
            })
    }

    fn update(
        &self,
        session: &mut RemoteSession<'_>,
        video_id: &VideoId,
        language: &LanguageCode,
        caption_id: Option<&CaptionId>,
        file: &Path,
    ) -> Result<Outcome, ExecError> {
        let mut step = UpdateStep::start(caption_id);
        loop {
            let found = match &step {
                UpdateStep::ById(id) => match session.update_caption(id, video_id, file) {
                    Ok(caption) => Some(caption),
                    Err(err) if err.is_not_found() => {
                        tracing::warn!("caption {id} not found; searching {video_id} by language");
                        session.invalidate_listing(video_id);
                        None
                    }
                    Err(err) => return Err(err.into()),
                },
                UpdateStep::ByLanguage => {
                    let listed = session.list_captions(video_id)?;
                    match listed.iter().find(|c| language.matches(&c.language)) {
                        Some(existing) => {
                            Some(session.update_caption(&existing.id, video_id, file)?)
                        }
                        None => {
                            tracing::info!(
                                "no '{language}' caption on {video_id}; uploading a new one"
                            );
                            None
                        }
                    }
                }
                UpdateStep::FreshUpload => {
                    let caption = self.upload(session, video_id, language, file)?;
                    return Ok(Outcome::Updated {
                        caption,
                        via: UpdateStep::FreshUpload,
                    });
                }
            };
            if let Some(caption) = found {
                return Ok(Outcome::Updated { caption, via: step });
            }
            step = step.fallback();
        }
    }
}

fn require_file(path: &Path) -> Result<(), ExecError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ExecError::MissingLocalFile {
            path: path.to_path_buf(),
        })
    }
}
