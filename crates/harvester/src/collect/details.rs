//! Per-repository details for the code-search dataset.

use std::collections::HashSet;
use std::time::Duration;

use crate::github::{GitHubClient, GitHubError};
use crate::rate_limit::ApiRateLimiter;
use crate::record::FieldValue;
use crate::retry::{RetryConfig, with_retry};
use crate::store::RecordStore;

use super::by_code::SEARCH_STRING_FIELD;
use super::error::CollectError;
use super::progress::{CollectProgress, ProgressCallback, emit};
use super::types::COURTESY_DELAY;

/// Rows fetched between two checkpoints.
pub const CHECKPOINT_EVERY: usize = 50;

/// Tuning of the details collector.
#[derive(Debug, Clone)]
pub struct DetailsConfig {
    /// Minimum time between two requests.
    pub pacing: Duration,
    pub checkpoint_every: usize,
    /// Backoff for rate-limited requests.
    pub retry: RetryConfig,
    /// Skip repositories already present in the output.
    pub resume: bool,
}

impl Default for DetailsConfig {
    fn default() -> Self {
        Self {
            pacing: COURTESY_DELAY,
            checkpoint_every: CHECKPOINT_EVERY,
            retry: RetryConfig::default(),
            resume: false,
        }
    }
}

/// Result of a details run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DetailsSummary {
    pub fetched: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Fetches details for every repository of a code-search dataset.
pub struct DetailsCollector<'a> {
    client: &'a GitHubClient,
    config: &'a DetailsConfig,
    limiter: ApiRateLimiter,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a> DetailsCollector<'a> {
    pub fn new(client: &'a GitHubClient, config: &'a DetailsConfig) -> Self {
        Self {
            client,
            config,
            limiter: ApiRateLimiter::every(config.pacing),
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    /// Fetch details for every `owner/name` key of `source` into `out`.
    ///
    /// Keys without a `/` are skipped. `out` is flushed every
    /// `checkpoint_every` repositories and at the end.
    pub async fn run(
        &self,
        source: &RecordStore,
        out: &mut RecordStore,
    ) -> Result<DetailsSummary, CollectError> {
        let mut keys: Vec<&str> = source.iter().map(|(key, _)| key).collect();
        keys.sort_unstable();

        // GitHub owner and repository names are case-insensitive.
        let known: HashSet<String> = if self.config.resume {
            out.iter().map(|(key, _)| key.to_ascii_lowercase()).collect()
        } else {
            HashSet::new()
        };

        let mut summary = DetailsSummary::default();
        let targets: Vec<&str> = keys
            .into_iter()
            .filter(|key| {
                let keep = key.contains('/') && !known.contains(&key.to_ascii_lowercase());
                if !keep {
                    summary.skipped += 1;
                }
                keep
            })
            .collect();
        let total = targets.len();
        tracing::info!(total, skipped = summary.skipped, "Fetching repository details");

        let mut since_checkpoint = 0;
        for (done, key) in targets.into_iter().enumerate() {
            let Some((owner, name)) = key.split_once('/') else {
                continue;
            };
            let search_string = source
                .get(key)
                .and_then(|r| r.get(SEARCH_STRING_FIELD))
                .cloned()
                .unwrap_or(FieldValue::Null);

            self.limiter.wait().await;
            let result = with_retry(
                || self.client.repository_details(owner, name),
                self.config.retry.clone(),
                |e: &GitHubError| e.is_rate_limited(),
                key,
                self.on_progress,
            )
            .await;

            match result {
                Ok(Some(details)) => {
                    out.insert(details.to_record(search_string))?;
                    summary.fetched += 1;
                    tracing::debug!(repository = key, "Fetched details");
                    emit(
                        self.on_progress,
                        CollectProgress::DetailsFetched {
                            repository: key.to_string(),
                            done: done + 1,
                            total,
                        },
                    );
                }
                Ok(None) => {
                    summary.failed += 1;
                    tracing::warn!(repository = key, "Repository not found");
                    emit(
                        self.on_progress,
                        CollectProgress::DetailsFailed {
                            repository: key.to_string(),
                            error: "not found".to_string(),
                        },
                    );
                }
                Err(e) => {
                    summary.failed += 1;
                    tracing::warn!(repository = key, error = %e, "Could not fetch details");
                    emit(
                        self.on_progress,
                        CollectProgress::DetailsFailed {
                            repository: key.to_string(),
                            error: e.to_string(),
                        },
                    );
                }
            }

            since_checkpoint += 1;
            if since_checkpoint == self.config.checkpoint_every {
                out.flush()?;
                since_checkpoint = 0;
            }
        }

        out.flush()?;
        Ok(summary)
    }
}
