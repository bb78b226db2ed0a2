use harvester::collect::CollectProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: CollectProgress) {
        match event {
            CollectProgress::BracketStarted {
                min_stars,
                max_stars,
                filter,
            } => {
                tracing::info!(min_stars, max_stars = ?max_stars, filter = %filter, "Starting bracket");
            }

            CollectProgress::Requesting {
                page_size,
                high_water,
            } => {
                tracing::debug!(page_size, high_water, "Requesting page");
            }

            CollectProgress::PageMerged {
                count,
                stored,
                total,
                at,
            } => {
                tracing::info!(count, stored, total, at = %at.format("%H:%M:%S"), "Merged page");
            }

            CollectProgress::Throttled {
                page_size,
                increment,
            } => {
                tracing::warn!(page_size, increment, "Server timed out, shrinking page size");
            }

            CollectProgress::RateLimited { wait } => {
                tracing::warn!(seconds = wait.as_secs(), "Rate limited, waiting");
            }

            CollectProgress::MalformedResponse { status, reason } => {
                tracing::warn!(status, reason = %reason, "Unreadable reply, retrying");
            }

            CollectProgress::TransportFailed { error } => {
                tracing::warn!(error = %error, "Request failed, retrying");
            }

            CollectProgress::CapRestart {
                min_stars,
                max_stars,
            } => {
                tracing::info!(min_stars, max_stars = ?max_stars, "Result cap reached, restarting");
            }

            CollectProgress::BracketDone {
                min_stars,
                collected,
            } => {
                tracing::info!(min_stars, collected, "Bracket complete");
            }

            CollectProgress::BracketFailed { min_stars, error } => {
                tracing::warn!(min_stars, error = %error, "Bracket failed");
            }

            CollectProgress::Recovering { wait } => {
                tracing::info!(seconds = wait.as_secs(), "Pausing before the next bracket");
            }

            CollectProgress::Aborted { error } => {
                tracing::error!(error = %error, "Collection aborted");
            }

            CollectProgress::Flushed { path, rows } => {
                tracing::debug!(path = %path.display(), rows, "Saved");
            }

            CollectProgress::CodeSearchPage {
                search_string,
                page,
                items,
                repositories,
            } => {
                tracing::debug!(search_string = %search_string, page, items, repositories, "Code search page");
            }

            CollectProgress::CodeSearchRateLimited {
                search_string,
                page,
                wait,
            } => {
                tracing::warn!(
                    search_string = %search_string,
                    page,
                    seconds = wait.as_secs(),
                    "Code search rate limited"
                );
            }

            CollectProgress::CodeSearchDone {
                search_string,
                pages,
            } => {
                tracing::debug!(search_string = %search_string, pages, "Code search string done");
            }

            CollectProgress::DetailsFetched {
                repository,
                done,
                total,
            } => {
                tracing::debug!(repository = %repository, done, total, "Fetched details");
            }

            CollectProgress::DetailsFailed { repository, error } => {
                tracing::warn!(repository = %repository, error = %error, "Skipped repository");
            }

            CollectProgress::RateLimitBackoff {
                repository,
                retry_after_ms,
                attempt,
            } => {
                tracing::warn!(
                    repository = %repository,
                    retry_after_ms,
                    attempt,
                    "Rate limited, backing off"
                );
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
