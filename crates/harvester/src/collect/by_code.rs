//! Code-content search for RPA fingerprints.
//!
//! Every fingerprint string is searched page by page through the REST code
//! search. Each hit's repository is recorded together with the string that
//! found it; a later string overwrites an earlier one for the same repository.

use std::time::Duration;

use tokio::time::sleep;

use crate::github::{GitHubClient, GitHubError};
use crate::rate_limit::ApiRateLimiter;
use crate::record::{FieldValue, RepositoryRecord};
use crate::store::RecordStore;

use super::error::CollectError;
use super::progress::{CollectProgress, ProgressCallback, emit};
use super::types::{COURTESY_DELAY, RECOVERY_DELAY};

/// Column holding the fingerprint that found a repository.
pub const SEARCH_STRING_FIELD: &str = "search_string";

/// Column holding `owner/name` in the code-search dataset.
pub const REPOSITORY_FIELD: &str = "repository";

/// Highest page the code search is asked for.
pub const DEFAULT_MAX_PAGES: u32 = 100;

/// Fingerprints of popular RPA tools.
pub const DEFAULT_SEARCH_STRINGS: &[&str] = &[
    // Python-RPA / Robocorp
    "\"import rpa\" in:file",
    "\"from rpa\" in:file",
    // Robot Framework
    "\"*** Tasks ***\" in:file",
    "\"*** Keywords ***\" in:file",
    // Scrapy
    "\"import scrapy\" in:file",
    "\"from scrapy\" in:file",
    // TagUI
    "\"import tagui\" in:file",
    "\"tagui.do\" in:file",
    // SikuliX
    "\"import sikuli\" in:file",
    "\"org.sikuli.script\" in:file",
    // UiPath
    "\"UiPath.Core\" in:file",
    // Blue Prism
    "extension:bprelease",
    "extension:bpproj",
    // Automation Anywhere
    "\"Automation Anywhere\" in:file",
    "extension:atmx",
    "extension:aabot",
    // Power Automate
    "\"Microsoft.Flow\" in:file",
    "\"flowDefinition\" in:file",
    // WorkFusion
    "\"com.workfusion\" in:file",
    "\"bot-task\" in:file",
    "extension:rpae",
    // HelpSystems Automate
    "extension:aml",
    // WinAutomation
    "\"WinAutomation\" in:file",
    "extension:wap",
    // AutoHotkey
    "extension:ahk",
    "\"#Persistent\" in:file",
    // Robot Framework / Robocorp
    "extension:robot",
    // ElectroNeek
    "\"electroneek\" in:file",
    "extension:enbot",
    // AntWorks
    "\"AntWorks\" in:file",
    "extension:awproj",
    // OpenRPA
    "\"OpenRPA\" in:file",
    "\"OpenFlow\" in:file",
    // NICE RPA
    "extension:nra",
    "extension:nicescript",
];

/// Tuning of the code-search collector.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeSearchConfig {
    pub search_strings: Vec<String>,
    pub max_pages: u32,
    /// Minimum time between two requests.
    pub pacing: Duration,
    /// Wait after a rate limit without `Retry-After`.
    pub rate_limit_pause: Duration,
}

impl Default for CodeSearchConfig {
    fn default() -> Self {
        Self {
            search_strings: DEFAULT_SEARCH_STRINGS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_pages: DEFAULT_MAX_PAGES,
            pacing: COURTESY_DELAY,
            rate_limit_pause: RECOVERY_DELAY,
        }
    }
}

/// Result of a code-search run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CodeSearchSummary {
    /// Pages fetched with at least one hit.
    pub pages: u32,
    /// Hits seen across all strings.
    pub hits: usize,
    /// Distinct repositories in the store afterwards.
    pub repositories: usize,
}

/// Runs the fingerprint searches.
pub struct CodeSearchCollector<'a> {
    client: &'a GitHubClient,
    config: &'a CodeSearchConfig,
    limiter: ApiRateLimiter,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a> CodeSearchCollector<'a> {
    pub fn new(client: &'a GitHubClient, config: &'a CodeSearchConfig) -> Self {
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

    /// Search every fingerprint, recording hits in `store`.
    ///
    /// `store` should be keyed by the `repository` column. It is flushed after
    /// each fingerprint.
    pub async fn run(&self, store: &mut RecordStore) -> Result<CodeSearchSummary, CollectError> {
        let mut summary = CodeSearchSummary::default();
        for search_string in &self.config.search_strings {
            let pages = self.search(search_string, store, &mut summary).await?;
            tracing::info!(search_string, pages, repositories = store.len(), "Search string done");
            emit(
                self.on_progress,
                CollectProgress::CodeSearchDone {
                    search_string: search_string.clone(),
                    pages,
                },
            );
            store.flush()?;
        }
        summary.repositories = store.len();
        Ok(summary)
    }

    async fn search(
        &self,
        search_string: &str,
        store: &mut RecordStore,
        summary: &mut CodeSearchSummary,
    ) -> Result<u32, CollectError> {
        let mut page = 1;
        let mut fetched = 0;
        while page <= self.config.max_pages {
            self.limiter.wait().await;
            tracing::debug!(search_string, page, "Searching code");

            let result = match self.client.search_code(search_string, page).await {
                Ok(result) => result,
                Err(GitHubError::RateLimited { retry_after, .. }) => {
                    let wait = retry_after.unwrap_or(self.config.rate_limit_pause);
                    tracing::warn!(search_string, page, seconds = wait.as_secs(), "Code search rate limited");
                    emit(
                        self.on_progress,
                        CollectProgress::CodeSearchRateLimited {
                            search_string: search_string.to_string(),
                            page,
                            wait,
                        },
                    );
                    sleep(wait).await;
                    continue;
                }
                Err(e) if e.is_transient() => {
                    tracing::warn!(search_string, page, error = %e, "Code search failed, retrying");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(search_string, page, error = %e, "Code search stopped");
                    break;
                }
            };

            if result.items.is_empty() {
                tracing::debug!(search_string, page, "No more results");
                break;
            }

            for item in &result.items {
                store.insert(RepositoryRecord::from_cells([
                    (REPOSITORY_FIELD, FieldValue::from(item.repository.full_name())),
                    (SEARCH_STRING_FIELD, FieldValue::from(search_string)),
                ]))?;
            }
            summary.pages += 1;
            summary.hits += result.items.len();
            fetched += 1;

            emit(
                self.on_progress,
                CollectProgress::CodeSearchPage {
                    search_string: search_string.to_string(),
                    page,
                    items: result.items.len(),
                    repositories: store.len(),
                },
            );
            page += 1;
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};
    use tokio::time::Instant;

    use super::*;
    use crate::http::{HttpMethod, HttpResponse, MockTransport};
    use crate::store::IdentityKey;

    const API: &str = "https://api.test";

    fn url(query: &str, page: u32) -> String {
        format!(
            "{API}/search/code?q={}&per_page=100&page={page}",
            urlencoding::encode(query)
        )
    }

    fn hits(repos: &[(&str, &str)]) -> Value {
        let items: Vec<Value> = repos
            .iter()
            .map(|(owner, name)| {
                json!({"name": "f", "repository": {"name": name, "owner": {"login": owner}}})
            })
            .collect();
        json!({"total_count": items.len(), "items": items})
    }

    fn config(strings: &[&str]) -> CodeSearchConfig {
        CodeSearchConfig {
            search_strings: strings.iter().map(|s| (*s).to_string()).collect(),
            max_pages: 3,
            pacing: Duration::from_millis(1),
            rate_limit_pause: Duration::from_secs(60),
        }
    }

    #[test]
    fn default_fingerprints() {
        assert_eq!(DEFAULT_SEARCH_STRINGS.len(), 35);
        assert_eq!(CodeSearchConfig::default().max_pages, 100);
    }

    #[tokio::test(start_paused = true)]
    async fn later_strings_overwrite_and_empty_pages_stop() {
        let transport = MockTransport::new();
        transport.push_json(
            HttpMethod::Get,
            url("extension:robot", 1),
            hits(&[("a", "x"), ("b", "y")]),
        );
        transport.push_json(HttpMethod::Get, url("extension:robot", 2), hits(&[]));
        transport.push_json(HttpMethod::Get, url("extension:ahk", 1), hits(&[("a", "x")]));
        transport.push_json(HttpMethod::Get, url("extension:ahk", 2), hits(&[]));
        let client = GitHubClient::with_api_url(Arc::new(transport.clone()), "t", API);
        let config = config(&["extension:robot", "extension:ahk"]);
        let mut store = RecordStore::new(IdentityKey::repository_column());

        let summary = CodeSearchCollector::new(&client, &config)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(summary.repositories, 2);
        assert_eq!(summary.hits, 3);
        assert_eq!(store.get("a/x").unwrap().cell(SEARCH_STRING_FIELD), "extension:ahk");
        assert_eq!(store.get("b/y").unwrap().cell(SEARCH_STRING_FIELD), "extension:robot");
        assert_eq!(transport.requests().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_retries_the_same_page() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            url("extension:nra", 1),
            HttpResponse {
                status: 403,
                headers: vec![],
                body: br#"{"message": "API rate limit exceeded"}"#.to_vec(),
            },
        );
        transport.push_json(HttpMethod::Get, url("extension:nra", 1), hits(&[("n", "r")]));
        transport.push_json(HttpMethod::Get, url("extension:nra", 2), hits(&[]));
        let client = GitHubClient::with_api_url(Arc::new(transport.clone()), "t", API);
        let config = config(&["extension:nra"]);
        let mut store = RecordStore::new(IdentityKey::repository_column());

        let started = Instant::now();
        CodeSearchCollector::new(&client, &config)
            .run(&mut store)
            .await
            .unwrap();

        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(store.contains("n/r"));
        assert_eq!(transport.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_end_the_string_and_max_pages_is_honored() {
        let transport = MockTransport::new();
        transport.push_response(
            HttpMethod::Get,
            url("extension:wap", 1),
            HttpResponse {
                status: 422,
                headers: vec![],
                body: b"{}".to_vec(),
            },
        );
        for page in 1..=3 {
            transport.push_json(HttpMethod::Get, url("extension:aml", page), hits(&[("m", "l")]));
        }
        let client = GitHubClient::with_api_url(Arc::new(transport.clone()), "t", API);
        let config = config(&["extension:wap", "extension:aml"]);
        let mut store = RecordStore::new(IdentityKey::repository_column());

        let summary = CodeSearchCollector::new(&client, &config)
            .run(&mut store)
            .await
            .unwrap();

        assert_eq!(summary.pages, 3);
        assert_eq!(transport.requests().len(), 4);
        assert_eq!(store.len(), 1);
    }
}
