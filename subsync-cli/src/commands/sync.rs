//! `subsync sync`: reconcile one project with the remote.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use subsync_core::types::ProjectName;
use subsync_sync::pipeline::{self, ActionStatus, SyncOptions, SyncReport};
use subsync_sync::reconcile::Change;

use crate::context::{self, Remote};

/// Arguments for `subsync sync`.
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Project to synchronize.
    pub project: String,

    /// Show the plan without calling the remote or saving anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Delete remote captions whose local file was removed.
    #[arg(long)]
    pub allow_deletes: bool,

    /// Ignore cached listings (fresh responses are still cached).
    #[arg(long)]
    pub no_cache: bool,

    /// Skip the quota confirmation prompt.
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl SyncArgs {
    pub fn run(self) -> Result<()> {
        let home = context::home()?;
        let mut remote = Remote::open(&home, self.no_cache);
        let mut confirm = context::confirmer(self.yes);
        let name = ProjectName::from(self.project.as_str());
        let opts = SyncOptions {
            dry_run: self.dry_run,
            allow_deletes: self.allow_deletes,
        };

        let result = {
            let mut session = remote.session();
            pipeline::sync_project_at(&home, &name, &mut session, opts, confirm.as_mut())
        };
        remote.report_quota();
        let report = result.with_context(|| format!("sync failed for '{name}'"))?;

        if report.aborted {
            context::print_aborted();
            return Ok(());
        }
        print_report(&report);
        Ok(())
    }
}

fn print_report(report: &SyncReport) {
    let prefix = if report.dry_run { "[dry-run] " } else { "" };

    for skipped in &report.skipped_files {
        println!(
            "{prefix}{} {} ({})",
            "skipped".yellow(),
            skipped.path.display(),
            skipped.reason
        );
    }
    for pair in &report.pairs {
        if pair.change == Change::Removed && !pair.queued {
            println!(
                "{prefix}{} {}/{} removed locally (use --allow-deletes to delete remotely)",
                "!".yellow(),
                pair.video_id,
                pair.language
            );
        }
    }

    if report.actions.is_empty() {
        println!("{prefix}✓ '{}' — nothing to do", report.project);
        return;
    }

    for entry in &report.actions {
        let line = format!("{} — {}", entry.action, entry.status);
        match &entry.status {
            ActionStatus::Applied(_) if report.dry_run => println!("{prefix}  ~  {line}"),
            ActionStatus::Applied(_) => println!("  {}  {line}", "✓".green()),
            ActionStatus::Failed(_) => println!("  {}  {}", "✗".red(), line.red()),
            ActionStatus::Skipped(_) => println!("  {}  {}", "-".yellow(), line.yellow()),
        }
    }

    let failures = report.failures();
    let summary = format!(
        "{prefix}'{}': {} action(s), {} applied, {} failed (estimated {} quota units)",
        report.project,
        report.actions.len(),
        report.applied(),
        failures,
        report.estimated_cost
    );
    if failures > 0 {
        println!("{}", summary.red());
    } else {
        println!("{}", summary.green());
    }
}
