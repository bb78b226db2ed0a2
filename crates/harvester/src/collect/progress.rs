//! Progress events emitted while collecting.
//!
//! The library never prints; callers that want feedback pass a
//! [`ProgressCallback`] and render the events however they like.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveTime;

/// Progress events emitted by the collectors.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum CollectProgress {
    /// Starting a star bracket.
    BracketStarted {
        min_stars: u64,
        max_stars: Option<u64>,
        /// The rendered search filter.
        filter: String,
    },

    /// About to request the next page.
    Requesting {
        page_size: u32,
        /// Star count of the last repository seen in this bracket.
        high_water: u64,
    },

    /// A page was merged into the store.
    PageMerged {
        /// Repositories on this page.
        count: usize,
        /// Repositories in the store so far, across brackets.
        stored: usize,
        /// Result count reported by the first page of the bracket.
        total: u64,
        /// Local wall-clock time of the merge.
        at: NaiveTime,
    },

    /// The server timed out; the page size was cut.
    Throttled { page_size: u32, increment: u32 },

    /// The server asked us to wait before continuing.
    RateLimited { wait: Duration },

    /// The reply was not JSON; the same page will be requested again.
    MalformedResponse { status: u16, reason: String },

    /// The request never got a reply; the same page will be requested again.
    TransportFailed { error: String },

    /// The bracket ran into the result cap and restarts at a higher minimum.
    CapRestart { min_stars: u64, max_stars: Option<u64> },

    /// A bracket finished.
    BracketDone { min_stars: u64, collected: usize },

    /// A bracket failed; the run moves on after a pause.
    BracketFailed { min_stars: u64, error: String },

    /// Pausing before the next bracket after a failure.
    Recovering { wait: Duration },

    /// The run stopped on an unrecoverable error.
    Aborted { error: String },

    /// A record store was written to disk.
    Flushed { path: PathBuf, rows: usize },

    /// A code search page was processed.
    CodeSearchPage {
        search_string: String,
        page: u32,
        items: usize,
        repositories: usize,
    },

    /// Code search hit the rate limit; the page will be retried.
    CodeSearchRateLimited {
        search_string: String,
        page: u32,
        wait: Duration,
    },

    /// Code search for one string ended.
    CodeSearchDone {
        search_string: String,
        pages: u32,
    },

    /// Details of one repository were fetched.
    DetailsFetched {
        repository: String,
        done: usize,
        total: usize,
    },

    /// Details of one repository could not be fetched; it is skipped.
    DetailsFailed { repository: String, error: String },

    /// A details request is being retried after a rate limit.
    RateLimitBackoff {
        repository: String,
        retry_after_ms: u64,
        attempt: u32,
    },
}

/// Callback receiving progress events.
pub type ProgressCallback = Box<dyn Fn(CollectProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: CollectProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
