//! `subsync report`: a wide, read-only CSV of which languages each video has.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use subsync_sync::batch;

use crate::context::{self, Remote};

/// Arguments for `subsync report`.
#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Channel nickname from `~/.subsync/config.yaml`.
    pub channel: String,

    /// Output path (default: `report_<channel>.csv`).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub no_cache: bool,
}

impl ReportArgs {
    pub fn run(self) -> Result<()> {
        let home = context::home()?;
        let mut remote = Remote::open(&home, self.no_cache);
        let channel_id = remote
            .config
            .channel_id(&self.channel, &home)
            .context("cannot resolve channel")?
            .to_string();
        let output = self
            .output
            .unwrap_or_else(|| PathBuf::from(format!("report_{}.csv", self.channel)));

        let result = report(&mut remote, &channel_id, &output);
        remote.report_quota();
        match result? {
            0 => println!("{}", "No videos found to generate a report.".yellow()),
            rows => println!(
                "{} wrote {rows} video row(s) to {}",
                "✓".green(),
                output.display()
            ),
        }
        Ok(())
    }
}

fn report(remote: &mut Remote, channel_id: &str, output: &Path) -> Result<usize> {
    let mut session = remote.session();
    let videos = session
        .channel_videos(channel_id)
        .with_context(|| format!("failed to list videos of {channel_id}"))?;
    if videos.is_empty() {
        return Ok(0);
    }
    let file =
        File::create(output).with_context(|| format!("cannot create {}", output.display()))?;
    Ok(batch::export_wide_report(&videos, &mut session, file)?)
}
