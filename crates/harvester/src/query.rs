//! Search filters and the star-bracket plan.
//!
//! A [`SearchFilter`] renders to the GitHub search syntax used by the
//! repository search query, e.g.
//!
//! ```text
//! is:public archived:false fork:false stars:>=1000 pushed:>=2025-01-01 sort:stars-asc
//! ```
//!
//! Results are requested in ascending star order; the pagination controller
//! relies on that to know where to restart after hitting the result cap.

use std::fmt;

use chrono::{Days, Local, NaiveDate};

/// Default recency window, in days.
pub const DEFAULT_RECENT_DAYS: u64 = 120;

/// Fixed predicates every search carries.
const EXCLUSIONS: &str = "is:public archived:false fork:false";

/// Result ordering every search carries.
const ORDERING: &str = "sort:stars-asc";

/// An immutable repository search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    min_stars: u64,
    max_stars: Option<u64>,
    pushed_since: NaiveDate,
}

impl SearchFilter {
    /// Filter for `[min_stars, max_stars]` over repositories pushed in the
    /// last `recent_days` days before `today`.
    #[must_use]
    pub fn new(min_stars: u64, max_stars: Option<u64>, recent_days: u64, today: NaiveDate) -> Self {
        let pushed_since = today
            .checked_sub_days(Days::new(recent_days))
            .unwrap_or(NaiveDate::MIN);
        Self {
            min_stars,
            max_stars,
            pushed_since,
        }
    }

    #[must_use]
    pub fn min_stars(&self) -> u64 {
        self.min_stars
    }

    #[must_use]
    pub fn max_stars(&self) -> Option<u64> {
        self.max_stars
    }

    #[must_use]
    pub fn pushed_since(&self) -> NaiveDate {
        self.pushed_since
    }

    /// The same filter with a new lower star bound.
    ///
    /// Used to page around the result cap: the upper bound and recency
    /// window are unchanged.
    #[must_use]
    pub fn restarted_at(&self, min_stars: u64) -> Self {
        Self {
            min_stars,
            ..self.clone()
        }
    }
}

impl fmt::Display for SearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{EXCLUSIONS} ")?;
        match self.max_stars {
            Some(max) => write!(f, "stars:{}..{max}", self.min_stars)?,
            None => write!(f, "stars:>={}", self.min_stars)?,
        }
        write!(
            f,
            " pushed:>={} {ORDERING}",
            self.pushed_since.format("%Y-%m-%d")
        )
    }
}

/// Build the filter for a bracket, counting the recency window back from
/// `today` (the local date when `None`).
#[must_use]
pub fn build_filter(
    min_stars: u64,
    max_stars: Option<u64>,
    recent_days: u64,
    today: Option<NaiveDate>,
) -> SearchFilter {
    let today = today.unwrap_or_else(|| Local::now().date_naive());
    SearchFilter::new(min_stars, max_stars, recent_days, today)
}

/// Descending list of bracket minimums sharing one upper bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketPlan {
    /// First (highest) bracket minimum.
    pub start: u64,
    /// Exclusive lower end of the plan.
    pub stop: u64,
    /// Distance between consecutive minimums.
    pub step: u64,
    /// Upper star bound shared by every bracket.
    pub max_stars: Option<u64>,
}

impl Default for BracketPlan {
    fn default() -> Self {
        Self {
            start: 1000,
            stop: 100,
            step: 200,
            max_stars: None,
        }
    }
}

impl BracketPlan {
    /// The bracket minimums, highest first.
    ///
    /// A zero step yields only `start` (when it is above `stop`).
    #[must_use]
    pub fn thresholds(&self) -> Vec<u64> {
        let mut out = Vec::new();
        let mut current = self.start;
        while current > self.stop {
            out.push(current);
            if self.step == 0 {
                break;
            }
            match current.checked_sub(self.step) {
                Some(next) => current = next,
                None => break,
            }
        }
        out
    }
}
