//! Shared collection types and constants.

use std::time::Duration;

use chrono::NaiveDate;

use crate::query::DEFAULT_RECENT_DAYS;

use super::aimd::AimdLimits;

/// Search API result cap per query.
pub const RESULT_CAP: u64 = 1000;

/// Stars subtracted from the high-water mark when restarting past the cap.
pub const RESTART_OVERLAP: u64 = 10;

/// Pause after every search page.
pub const COURTESY_DELAY: Duration = Duration::from_secs(1);

/// Pause after a failed bracket, and after a code-search rate limit.
pub const RECOVERY_DELAY: Duration = Duration::from_secs(60);

/// Tuning of the starred-repository collector.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    pub initial_page_size: u32,
    pub initial_increment: u32,
    pub limits: AimdLimits,
    pub result_cap: u64,
    pub restart_overlap: u64,
    pub courtesy_delay: Duration,
    pub recovery_delay: Duration,
    /// Only repositories pushed within this many days are searched.
    pub recent_days: u64,
    /// Date the recency window counts back from; the local date when `None`.
    pub today: Option<NaiveDate>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            initial_page_size: 1,
            initial_increment: 8,
            limits: AimdLimits::default(),
            result_cap: RESULT_CAP,
            restart_overlap: RESTART_OVERLAP,
            courtesy_delay: COURTESY_DELAY,
            recovery_delay: RECOVERY_DELAY,
            recent_days: DEFAULT_RECENT_DAYS,
            today: None,
        }
    }
}

/// Outcome of one controller iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A page was merged and there are more pages.
    PageOk { merged: usize },
    /// Nothing usable came back; the same request will be repeated.
    Retry,
    /// The server timed out; the next request is smaller.
    Throttled,
    /// The cap was hit; paging restarts at a higher lower bound.
    CapRestart { min_stars: u64 },
    /// The bracket is exhausted.
    Done,
}

/// Result of one bracket.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BracketSummary {
    pub min_stars: u64,
    pub max_stars: Option<u64>,
    pub collected: usize,
    pub total: Option<u64>,
    pub pages: u32,
    pub restarts: u32,
}

/// Result of a whole starred-repository run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Brackets that finished.
    pub completed: Vec<BracketSummary>,
    /// Brackets that failed, with the reason.
    pub failed: Vec<(u64, String)>,
    /// Rows written by the last flush.
    pub stored: usize,
}
