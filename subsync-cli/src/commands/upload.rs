//! `subsync upload`: push one or more subtitle files to a single video.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;

use subsync_core::types::{LanguageCode, VideoId};
use subsync_sync::quota::PlannedCounts;
use subsync_sync::reconcile::{Action, Payload};
use subsync_sync::scanner::parse_flat_stem;
use subsync_sync::Executor;

use crate::context::{self, Remote};

/// Arguments for `subsync upload`.
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Subtitle files. Without `--video`/`--language` each name must look
    /// like `<videoId>_<language>.srt`.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Target video (requires `--language` and a single file).
    #[arg(long, requires = "language")]
    pub video: Option<String>,

    /// Caption language for the single file given with `--video`.
    #[arg(long, requires = "video")]
    pub language: Option<String>,

    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl UploadArgs {
    pub fn run(self) -> Result<()> {
        let actions = self.plan()?;
        let home = context::home()?;
        let mut remote = Remote::open(&home, false);
        let mut confirm = context::confirmer(self.yes);

        let counts = PlannedCounts {
            uploads: actions.len(),
            ..PlannedCounts::default()
        };
        let mut failures = 0;
        {
            let mut session = remote.session();
            if !self.dry_run && !session.meter().preflight(counts, confirm.as_mut()) {
                context::print_aborted();
                return Ok(());
            }
            let executor = Executor::new(self.dry_run);
            for action in &actions {
                match executor.execute(&mut session, action) {
                    Ok(outcome) if self.dry_run => println!("[dry-run]  ~  {action} — {outcome}"),
                    Ok(outcome) => println!("  {}  {action} — {outcome}", "✓".green()),
                    Err(err) => {
                        failures += 1;
                        println!("  {}  {}", "✗".red(), format!("{action} — {err}").red());
                    }
                }
            }
        }
        remote.report_quota();
        if failures > 0 {
            bail!("{failures} of {} upload(s) failed", actions.len());
        }
        Ok(())
    }

    fn plan(&self) -> Result<Vec<Action>> {
        if let (Some(video), Some(language)) = (&self.video, &self.language) {
            if self.files.len() != 1 {
                bail!("--video/--language take exactly one file");
            }
            return Ok(vec![upload(
                VideoId::from(video.as_str()),
                LanguageCode::new(language),
                &self.files[0],
            )]);
        }

        let mut actions = Vec::with_capacity(self.files.len());
        for file in &self.files {
            let stem = file
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let (video_id, language) = parse_flat_stem(&stem).with_context(|| {
                format!(
                    "cannot infer video and language from '{}'; expected <videoId>_<language>.srt",
                    file.display()
                )
            })?;
            actions.push(upload(video_id, language, file));
        }
        if let Some(first) = actions.first() {
            if let Some(other) = actions.iter().find(|a| a.video_id != first.video_id) {
                bail!(
                    "all files must target the same video (found {} and {})",
                    first.video_id,
                    other.video_id
                );
            }
        }
        Ok(actions)
    }
}

fn upload(video_id: VideoId, language: LanguageCode, file: &Path) -> Action {
    Action {
        video_id,
        language,
        payload: Payload::Upload {
            local_path: file.to_path_buf(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(files: &[&str]) -> UploadArgs {
        UploadArgs {
            files: files.iter().map(PathBuf::from).collect(),
            video: None,
            language: None,
            dry_run: true,
            yes: false,
        }
    }

    #[test]
    fn parses_names_on_last_underscore() {
        let actions = args(&["dir/my_video_en.srt", "my_video_PT.srt"]).plan().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].video_id, VideoId::from("my_video"));
        assert_eq!(actions[1].language, LanguageCode::new("pt-BR"));
    }

    #[test]
    fn mixed_videos_are_rejected() {
        let err = args(&["a_en.srt", "b_en.srt"]).plan().unwrap_err();
        assert!(err.to_string().contains("same video"));
    }

    #[test]
    fn unparseable_name_is_rejected() {
        assert!(args(&["subtitles.srt"]).plan().is_err());
    }

    #[test]
    fn explicit_target_takes_one_file() {
        let mut explicit = args(&["a.srt"]);
        explicit.video = Some("vid".into());
        explicit.language = Some("es".into());
        let actions = explicit.plan().unwrap();
        assert_eq!(actions[0].language, LanguageCode::new("es-US"));

        explicit.files.push(PathBuf::from("b.srt"));
        assert!(explicit.plan().is_err());
    }
}
