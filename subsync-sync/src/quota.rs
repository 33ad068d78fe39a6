//! Quota meter.
//!
//! The platform bills every API call a fixed number of units against a daily
//! ceiling. [`QuotaMeter`] is the session's running total; it is owned by the
//! caller and passed down explicitly, never held in a global.

use std::fmt;

use subsync_core::config::DEFAULT_DAILY_QUOTA;

/// Billable remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    ChannelsList,
    PlaylistItemsList,
    VideosList,
    CaptionsList,
    CaptionsInsert,
    CaptionsUpdate,
    CaptionsDelete,
}

impl ApiOperation {
    /// Static cost in quota units.
    pub const fn cost(self) -> u64 {
        match self {
            ApiOperation::ChannelsList => 1,
            ApiOperation::PlaylistItemsList => 1,
            ApiOperation::VideosList => 1,
            ApiOperation::CaptionsList => 50,
            ApiOperation::CaptionsInsert => 400,
            ApiOperation::CaptionsUpdate => 450,
            ApiOperation::CaptionsDelete => 50,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ApiOperation::ChannelsList => "channels.list",
            ApiOperation::PlaylistItemsList => "playlistItems.list",
            ApiOperation::VideosList => "videos.list",
            ApiOperation::CaptionsList => "captions.list",
            ApiOperation::CaptionsInsert => "captions.insert",
            ApiOperation::CaptionsUpdate => "captions.update",
            ApiOperation::CaptionsDelete => "captions.delete",
        }
    }
}

impl fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Planned mutation counts for a pre-flight estimate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlannedCounts {
    pub uploads: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl PlannedCounts {
    pub fn is_empty(&self) -> bool {
        self.uploads == 0 && self.updates == 0 && self.deletes == 0
    }
}

/// Asks the user whether to go ahead.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Approves every prompt (`--yes`).
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoApprove;

impl Confirm for AutoApprove {
    fn confirm(&mut self, prompt: &str) -> bool {
        tracing::info!("{prompt} (auto-approved)");
        true
    }
}

/// Running total of quota units spent this session.
#[derive(Debug, Clone)]
pub struct QuotaMeter {
    total_spent: u64,
    daily_limit: u64,
}

impl Default for QuotaMeter {
    fn default() -> Self {
        Self::new(DEFAULT_DAILY_QUOTA)
    }
}

impl QuotaMeter {
    pub fn new(daily_limit: u64) -> Self {
        Self {
            total_spent: 0,
            daily_limit,
        }
    }

    /// Record one successful call. Returns the new total.
    pub fn charge(&mut self, op: ApiOperation) -> u64 {
        self.charge_n(op, 1)
    }

    /// Record `count` successful calls of the same kind.
    pub fn charge_n(&mut self, op: ApiOperation, count: u32) -> u64 {
        let cost = op.cost() * u64::from(count);
        if cost > 0 {
            self.total_spent = self.total_spent.saturating_add(cost);
            tracing::debug!(
                "quota +{cost} for '{op}'; session total {}",
                self.total_spent
            );
        }
        self.total_spent
    }

    pub fn total_spent(&self) -> u64 {
        self.total_spent
    }

    pub fn daily_limit(&self) -> u64 {
        self.daily_limit
    }

    /// True once usage passes 90% of the daily limit.
    pub fn near_limit(&self) -> bool {
        self.total_spent * 10 > self.daily_limit * 9
    }

    /// Projected cost of a batch of mutations.
    pub fn estimate(counts: PlannedCounts) -> u64 {
        counts.uploads as u64 * ApiOperation::CaptionsInsert.cost()
            + counts.updates as u64 * ApiOperation::CaptionsUpdate.cost()
            + counts.deletes as u64 * ApiOperation::CaptionsDelete.cost()
    }

    /// Pre-flight gate for a batch of mutations.
    ///
    /// Zero-cost batches pass without prompting. Never touches the running
    /// total, whatever the answer.
    pub fn preflight(&self, counts: PlannedCounts, confirm: &mut dyn Confirm) -> bool {
        let cost = Self::estimate(counts);
        if cost == 0 {
            return true;
        }
        let percentage = if self.daily_limit == 0 {
            100.0
        } else {
            cost as f64 / self.daily_limit as f64 * 100.0
        };
        let prompt = format!(
            "About to perform {} upload(s), {} update(s), {} delete(s), costing about {cost} quota units ({percentage:.1}% of the daily {} limit). Proceed?",
            counts.uploads, counts.updates, counts.deletes, self.daily_limit
        );
        let approved = confirm.confirm(&prompt);
        if !approved {
            tracing::warn!("operation aborted; no changes made");
        }
        approved
    }
}
