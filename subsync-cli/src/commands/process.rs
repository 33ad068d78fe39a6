//! `subsync process`: run the actions listed in a CSV file.

use std::fs::File;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use subsync_sync::batch::{self, BatchOptions};
use subsync_sync::ActionStatus;

use crate::context::{self, Remote};

/// Arguments for `subsync process`.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// CSV with columns video_id, video_title, caption_id, language, action, file_path.
    #[arg(long)]
    pub csv: PathBuf,

    #[arg(long)]
    pub dry_run: bool,

    #[arg(long)]
    pub no_cache: bool,

    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl ProcessArgs {
    pub fn run(self) -> Result<()> {
        let home = context::home()?;
        let file = File::open(&self.csv)
            .with_context(|| format!("CSV file not found at '{}'", self.csv.display()))?;
        let mut remote = Remote::open(&home, self.no_cache);
        let mut confirm = context::confirmer(self.yes);

        let result = {
            let mut session = remote.session();
            batch::process_batch(
                file,
                &mut session,
                BatchOptions {
                    dry_run: self.dry_run,
                },
                confirm.as_mut(),
            )
        };
        remote.report_quota();
        let report = result.with_context(|| format!("processing {} failed", self.csv.display()))?;

        if report.aborted {
            context::print_aborted();
            return Ok(());
        }
        if report.rows.is_empty() {
            println!("No actions found in {}", self.csv.display());
            return Ok(());
        }

        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        for row in &report.rows {
            let line = format!(
                "row {}: {} {} — {}",
                row.line, row.action, row.video_id, row.status
            );
            match row.status {
                ActionStatus::Applied(_) => println!("{prefix}  {}  {line}", "✓".green()),
                ActionStatus::Failed(_) => println!("  {}  {}", "✗".red(), line.red()),
                ActionStatus::Skipped(_) => println!("  {}  {}", "-".yellow(), line.yellow()),
            }
        }
        println!(
            "{prefix}{} row(s) processed, {} failed",
            report.rows.len(),
            report.failures()
        );
        Ok(())
    }
}
