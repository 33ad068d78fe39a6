//! Pieces every networked command shares: home directory, remote client,
//! response cache, quota meter and the confirmation prompt.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use subsync_core::Config;
use subsync_sync::cache::cache_dir_at;
use subsync_sync::{AutoApprove, Confirm, QuotaMeter, RemoteSession, ResponseCache};
use subsync_youtube::YouTubeClient;

pub fn home() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

/// Remote client plus the cache and meter that wrap it for one process.
pub struct Remote {
    pub config: Config,
    client: YouTubeClient,
    cache: ResponseCache,
    meter: QuotaMeter,
}

impl Remote {
    pub fn open(home: &std::path::Path, no_cache: bool) -> Self {
        let config = Config::load_at(home);
        let cache =
            ResponseCache::new(cache_dir_at(home), config.cache_freshness()).bypass_reads(no_cache);
        let meter = QuotaMeter::new(config.daily_quota);
        tracing::debug!(
            "remote: {} configured channel(s), cache freshness {}s, no_cache={no_cache}",
            config.channels.len(),
            config.cache_freshness_secs
        );
        Self {
            config,
            client: YouTubeClient::from_env(),
            cache,
            meter,
        }
    }

    pub fn session(&mut self) -> RemoteSession<'_> {
        RemoteSession::new(&self.client, &self.cache, &mut self.meter)
    }

    /// Print the units spent by this process.
    pub fn report_quota(&self) {
        let spent = self.meter.total_spent();
        if spent == 0 {
            return;
        }
        let limit = self.meter.daily_limit();
        let pct = spent as f64 / limit as f64 * 100.0;
        let line = format!("Quota used this session: {spent} / {limit} units ({pct:.1}%)");
        if self.meter.near_limit() {
            println!("{}", line.yellow());
            println!("{}", "Warning: close to the daily quota limit".yellow().bold());
        } else {
            println!("{line}");
        }
    }
}

/// Reads a y/N answer from stdin. Anything but `y`/`yes` declines.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        if io::stdout().flush().is_err() {
            return false;
        }
        let mut answer = String::new();
        match io::stdin().lock().read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn confirmer(assume_yes: bool) -> Box<dyn Confirm> {
    if assume_yes {
        Box::new(AutoApprove)
    } else {
        Box::new(StdinConfirm)
    }
}

pub fn print_aborted() {
    println!("{}", "operation aborted".yellow());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_y_and_yes_confirm() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("n"));
        assert!(!is_yes(""));
        assert!(!is_yes("yep"));
    }
}
