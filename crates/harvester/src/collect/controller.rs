//! The adaptive pagination controller of the starred-repository search.
//!
//! One bracket is paged as a loop of [`StarCollector::advance`] calls. Each
//! call issues one search request and folds the reply into the
//! [`PaginationState`] and the [`RecordStore`]:
//!
//! 1. transport failures and non-JSON bodies repeat the same request;
//! 2. a `Retry-After` header is slept off before the payload is looked at;
//! 3. a timeout error halves the page size, any other error is fatal;
//! 4. data is merged, the cursor advances and the page size grows;
//! 5. when the last page of a capped result set is reached, paging restarts
//!    just below the highest star count seen so far.
//!
//! Every iteration ends with a one second pause.

use chrono::Local;
use tokio::time::sleep;

use crate::github::types::SearchConnection;
use crate::github::{GitHubClient, GitHubError, SearchBody};
use crate::query::build_filter;
use crate::record::RepositoryRecord;
use crate::store::{RecordStore, StoreError};

use super::aimd::PageSizeController;
use super::error::CollectError;
use super::progress::{CollectProgress, ProgressCallback, emit};
use super::state::PaginationState;
use super::types::{BracketSummary, ControllerConfig, Step};

/// Drives the starred-repository search.
pub struct StarCollector<'a> {
    pub(super) client: &'a GitHubClient,
    pub(super) config: &'a ControllerConfig,
    pub(super) on_progress: Option<&'a ProgressCallback>,
}

impl<'a> StarCollector<'a> {
    pub fn new(client: &'a GitHubClient, config: &'a ControllerConfig) -> Self {
        Self {
            client,
            config,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ControllerConfig {
        self.config
    }

    /// Initial state of the bracket `[min_stars, max_stars]`.
    #[must_use]
    pub fn start_bracket(&self, min_stars: u64, max_stars: Option<u64>) -> PaginationState {
        let filter = build_filter(
            min_stars,
            max_stars,
            self.config.recent_days,
            self.config.today,
        );
        let sizing = PageSizeController::new(
            self.config.initial_page_size,
            self.config.initial_increment,
            self.config.limits,
        );
        PaginationState::new(filter, sizing)
    }

    /// Page through one bracket until it is exhausted.
    pub async fn run_bracket(
        &self,
        min_stars: u64,
        max_stars: Option<u64>,
        store: &mut RecordStore,
    ) -> Result<BracketSummary, CollectError> {
        let mut state = self.start_bracket(min_stars, max_stars);
        tracing::info!(min_stars, ?max_stars, filter = %state.filter, "Starting bracket");
        emit(
            self.on_progress,
            CollectProgress::BracketStarted {
                min_stars,
                max_stars,
                filter: state.filter.to_string(),
            },
        );

        while self.advance(&mut state, store).await? != Step::Done {}

        tracing::info!(
            min_stars,
            collected = state.collected,
            pages = state.pages,
            restarts = state.restarts,
            "Bracket finished"
        );
        emit(
            self.on_progress,
            CollectProgress::BracketDone {
                min_stars,
                collected: state.collected,
            },
        );

        Ok(BracketSummary {
            min_stars,
            max_stars,
            collected: state.collected,
            total: state.total,
            pages: state.pages,
            restarts: state.restarts,
        })
    }

    /// Issue one request and fold its reply into `state` and `store`.
    ///
    /// Errors leave the bracket; [`CollectError::is_fatal`] tells whether
    /// they end the run too.
    pub async fn advance(
        &self,
        state: &mut PaginationState,
        store: &mut RecordStore,
    ) -> Result<Step, CollectError> {
        let step = self.request_page(state, store).await?;
        sleep(self.config.courtesy_delay).await;
        Ok(step)
    }

    async fn request_page(
        &self,
        state: &mut PaginationState,
        store: &mut RecordStore,
    ) -> Result<Step, CollectError> {
        tracing::debug!(
            page_size = state.page_size(),
            high_water = state.high_water,
            cursor = ?state.cursor,
            "Requesting next page"
        );
        emit(
            self.on_progress,
            CollectProgress::Requesting {
                page_size: state.page_size(),
                high_water: state.high_water,
            },
        );

        let reply = match self
            .client
            .search_repositories(&state.filter, state.page_size(), state.cursor.as_deref())
            .await
        {
            Ok(reply) => reply,
            Err(e) if e.is_transient() => {
                tracing::warn!(error = %e, "Search request failed, retrying");
                emit(
                    self.on_progress,
                    CollectProgress::TransportFailed {
                        error: e.to_string(),
                    },
                );
                return Ok(Step::Retry);
            }
            Err(GitHubError::Decode(message)) => return Err(CollectError::Decode(message)),
            Err(e) => return Err(e.into()),
        };

        if let Some(wait) = reply.retry_after {
            tracing::info!(seconds = wait.as_secs(), "Rate limited, waiting before continuing");
            emit(self.on_progress, CollectProgress::RateLimited { wait });
            sleep(wait).await;
        }

        let response = match reply.body {
            SearchBody::Malformed { status, reason } => {
                tracing::warn!(status, reason, "Search reply is not JSON, retrying");
                emit(
                    self.on_progress,
                    CollectProgress::MalformedResponse {
                        status,
                        reason: reason.to_string(),
                    },
                );
                return Ok(Step::Retry);
            }
            SearchBody::Parsed(response) => response,
        };

        let mut step = Step::Retry;

        if let Some(error) = response.first_error() {
            if !error.is_timeout() {
                tracing::error!(message = %error.message, "Search returned an unexpected error");
                return Err(CollectError::Api {
                    message: error.message.clone(),
                });
            }
            state.sizing.shrink();
            tracing::info!(
                page_size = state.page_size(),
                "Search timed out, reducing page size"
            );
            emit(
                self.on_progress,
                CollectProgress::Throttled {
                    page_size: state.page_size(),
                    increment: state.sizing.increment(),
                },
            );
            step = Step::Throttled;
        }

        if let Some(data) = response.data {
            step = self.merge_page(state, store, data.search)?;
        }

        Ok(step)
    }

    fn merge_page(
        &self,
        state: &mut PaginationState,
        store: &mut RecordStore,
        search: SearchConnection,
    ) -> Result<Step, CollectError> {
        let total = *state.total.get_or_insert(search.repository_count);

        let merged = store.merge_nodes(&search.nodes).map_err(|e| match e {
            StoreError::MissingIdentity(node) => {
                CollectError::Decode(format!("search node without owner/name: {node}"))
            }
            other => other.into(),
        })?;
        state.collected += merged.len();
        state.pages += 1;
        if let Some(stars) = merged.last().and_then(RepositoryRecord::stargazers) {
            state.high_water = u64::try_from(stars).unwrap_or(0);
        }

        tracing::info!(
            "Processed {} of {} repositories at {}",
            store.len(),
            total,
            Local::now().format("%H:%M:%S")
        );
        emit(
            self.on_progress,
            CollectProgress::PageMerged {
                count: merged.len(),
                stored: store.len(),
                total,
                at: Local::now().time(),
            },
        );

        state.cursor = search.page_info.end_cursor;
        state.sizing.grow();

        if search.page_info.has_next_page {
            return Ok(Step::PageOk {
                merged: merged.len(),
            });
        }

        if search.repository_count > self.config.result_cap {
            return self.restart_past_cap(state);
        }

        Ok(Step::Done)
    }

    fn restart_past_cap(&self, state: &mut PaginationState) -> Result<Step, CollectError> {
        let min_stars = state.high_water.saturating_sub(self.config.restart_overlap);
        if let Some(previous) = state.last_restart_min
            && min_stars <= previous
        {
            return Err(CollectError::CapStalled {
                previous,
                attempted: min_stars,
            });
        }

        state.filter = state.filter.restarted_at(min_stars);
        state.cursor = None;
        state.last_restart_min = Some(min_stars);
        state.restarts += 1;

        tracing::info!(
            min_stars,
            "Reached the result cap, restarting from the last star count"
        );
        emit(
            self.on_progress,
            CollectProgress::CapRestart {
                min_stars,
                max_stars: state.filter.max_stars(),
            },
        );
        Ok(Step::CapRestart { min_stars })
    }
}
