//! Outer loop over star brackets.
//!
//! Brackets run one after another. A bracket-level failure costs a flush and
//! a pause before the next bracket; a fatal failure costs a flush and ends the
//! run. The store is flushed after every bracket whatever its outcome.

use tokio::time::sleep;

use crate::query::BracketPlan;
use crate::store::{RecordStore, StoreError};

use super::controller::StarCollector;
use super::error::CollectError;
use super::progress::{CollectProgress, emit};
use super::types::RunSummary;

impl StarCollector<'_> {
    /// Collect every bracket of `plan` into `store`.
    pub async fn run(
        &self,
        plan: &BracketPlan,
        store: &mut RecordStore,
    ) -> Result<RunSummary, CollectError> {
        let mut summary = RunSummary::default();

        for min_stars in plan.thresholds() {
            match self.run_bracket(min_stars, plan.max_stars, store).await {
                Ok(bracket) => summary.completed.push(bracket),
                Err(e) if e.is_fatal() => {
                    tracing::error!(min_stars, error = %e, "Aborting collection");
                    emit(
                        self.on_progress,
                        CollectProgress::Aborted {
                            error: e.to_string(),
                        },
                    );
                    if let Err(flush_error) = self.flush(store) {
                        tracing::error!(error = %flush_error, "Could not save collected repositories");
                    }
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(min_stars, error = %e, "Bracket failed, moving on");
                    emit(
                        self.on_progress,
                        CollectProgress::BracketFailed {
                            min_stars,
                            error: e.to_string(),
                        },
                    );
                    self.flush(store)?;
                    let wait = self.config.recovery_delay;
                    emit(self.on_progress, CollectProgress::Recovering { wait });
                    sleep(wait).await;
                    summary.failed.push((min_stars, e.to_string()));
                }
            }
            summary.stored = self.flush(store)?;
        }

        Ok(summary)
    }

    /// Flush the store and report it.
    pub fn flush(&self, store: &mut RecordStore) -> Result<usize, StoreError> {
        let rows = store.flush()?;
        if let Some(path) = store.path() {
            emit(
                self.on_progress,
                CollectProgress::Flushed {
                    path: path.to_path_buf(),
                    rows,
                },
            );
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::Instant;

    use super::*;
    use crate::collect::controller::tests::{GRAPHQL, client, config, page};
    use crate::http::{HttpMethod, MockTransport};

    fn plan(start: u64, stop: u64) -> BracketPlan {
        BracketPlan {
            start,
            stop,
            step: 200,
            max_stars: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn every_bracket_is_collected_and_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.csv");
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            GRAPHQL,
            page(1, &[("a", "x", 1200)], None, false),
        );
        transport.push_json(
            HttpMethod::Post,
            GRAPHQL,
            page(2, &[("a", "x", 1200), ("b", "y", 900)], None, false),
        );
        let client = client(&transport);
        let config = config();
        let collector = StarCollector::new(&client, &config);
        let mut store = RecordStore::repositories().open(&path).unwrap();

        let summary = collector.run(&plan(1000, 700), &mut store).await.unwrap();

        assert_eq!(summary.completed.len(), 2);
        assert!(summary.failed.is_empty());
        assert_eq!(summary.stored, 2);
        let reloaded = RecordStore::repositories().open(&path).unwrap();
        assert_eq!(reloaded.len(), 2);
        let bodies = transport.json_bodies();
        assert!(bodies[0]["variables"]["filter"].as_str().unwrap().contains("stars:>=1000"));
        assert!(bodies[1]["variables"]["filter"].as_str().unwrap().contains("stars:>=800"));
    }

    #[tokio::test(start_paused = true)]
    async fn bracket_failure_pauses_and_moves_on() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.csv");
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            GRAPHQL,
            json!({"data": {"search": {"nodes": []}}}),
        );
        transport.push_json(
            HttpMethod::Post,
            GRAPHQL,
            page(1, &[("b", "y", 900)], None, false),
        );
        let client = client(&transport);
        let config = config();
        let collector = StarCollector::new(&client, &config);
        let mut store = RecordStore::repositories().open(&path).unwrap();

        let started = Instant::now();
        let summary = collector.run(&plan(1000, 700), &mut store).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(61));
        assert_eq!(summary.failed.len(), 1);
        assert_eq!(summary.failed[0].0, 1000);
        assert_eq!(summary.completed.len(), 1);
        assert!(RecordStore::repositories().open(&path).unwrap().contains("b/y"));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_error_flushes_and_stops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.csv");
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Post,
            GRAPHQL,
            page(2, &[("a", "x", 1100)], Some("c1"), true),
        );
        transport.push_json(
            HttpMethod::Post,
            GRAPHQL,
            json!({"errors": [{"message": "Bad credentials"}]}),
        );
        let client = client(&transport);
        let config = config();
        let collector = StarCollector::new(&client, &config);
        let mut store = RecordStore::repositories().open(&path).unwrap();

        let err = collector
            .run(&plan(1000, 100), &mut store)
            .await
            .unwrap_err();

        assert!(err.is_fatal());
        assert_eq!(transport.requests().len(), 2);
        let reloaded = RecordStore::repositories().open(&path).unwrap();
        assert!(reloaded.contains("a/x"));
    }
}
