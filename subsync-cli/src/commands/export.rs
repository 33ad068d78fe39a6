//! `subsync export`: dump a channel's captions to the long CSV.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use subsync_sync::batch;

use crate::context::{self, Remote};

/// Arguments for `subsync export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Channel nickname from `~/.subsync/config.yaml`.
    pub channel: String,

    /// Output path (default: `captions_<channel>.csv`).
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub no_cache: bool,
}

impl ExportArgs {
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
            .unwrap_or_else(|| PathBuf::from(format!("captions_{}.csv", self.channel)));

        let result = export(&mut remote, &channel_id, &output);
        remote.report_quota();
        let rows = result?;

        println!(
            "{} wrote {rows} row(s) to {}",
            "✓".green(),
            output.display()
        );
        Ok(())
    }
}

fn export(remote: &mut Remote, channel_id: &str, output: &Path) -> Result<usize> {
    let mut session = remote.session();
    let videos = session
        .channel_videos(channel_id)
        .with_context(|| format!("failed to list videos of {channel_id}"))?;
    let file =
        File::create(output).with_context(|| format!("cannot create {}", output.display()))?;
    Ok(batch::export_captions_csv(&videos, &mut session, file)?)
}
