//! Proactive request pacing.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};

type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// A standalone API rate limiter using the governor crate.
///
/// ```ignore
/// use harvester::rate_limit::ApiRateLimiter;
///
/// let limiter = ApiRateLimiter::every(Duration::from_secs(1));
///
/// // Before each API call:
/// limiter.wait().await;
/// client.search_code(query, page).await?;
/// ```
#[derive(Clone)]
pub struct ApiRateLimiter {
    inner: Arc<GovernorRateLimiter>,
}

impl std::fmt::Debug for ApiRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
    }
}

impl ApiRateLimiter {
    /// Allow `requests_per_second` requests per second (at least one).
    pub fn new(requests_per_second: u32) -> Self {
        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        Self::from_quota(Quota::per_second(rps))
    }

    /// Allow one request per `period`, without bursts.
    ///
    /// A zero period falls back to one request per second.
    pub fn every(period: Duration) -> Self {
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        Self::from_quota(quota)
    }

    fn from_quota(quota: Quota) -> Self {
        Self {
            inner: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Wait until a request is allowed.
    pub async fn wait(&self) {
        self.inner.until_ready().await;
    }

    /// Take a slot if one is free right now.
    pub fn try_acquire(&self) -> bool {
        self.inner.check().is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_per_period_allows_a_single_immediate_request() {
        let limiter = ApiRateLimiter::every(Duration::from_secs(3600));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[test]
    fn zero_rate_is_treated_as_one() {
        let limiter = ApiRateLimiter::new(0);
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test]
    async fn first_wait_is_immediate() {
        let limiter = ApiRateLimiter::new(10);
        let started = std::time::Instant::now();
        limiter.wait().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
