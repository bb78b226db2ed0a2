use std::sync::Arc;
use std::time::Duration;

use harvester::github::GitHubClient;
use harvester::http::reqwest_transport::ReqwestTransport;
use harvester::store::RecordStore;

use crate::config::Config;
use crate::progress::ProgressReporter;

/// Per-request timeout of the HTTP client.
const HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Build an authenticated GitHub client from configuration.
///
/// Fails when no token is configured.
pub(crate) fn github_client(config: &Config) -> Result<GitHubClient, Box<dyn std::error::Error>> {
    let token = config.github_token()?;
    let transport = ReqwestTransport::with_timeout(HTTP_TIMEOUT)?;
    Ok(GitHubClient::with_api_url(
        Arc::new(transport),
        token,
        &config.github.api_url,
    ))
}

/// Save a store after Ctrl+C interrupted the command filling it.
pub(crate) fn save_interrupted(
    store: &mut RecordStore,
    reporter: &ProgressReporter,
) -> Result<(), Box<dyn std::error::Error>> {
    let rows = store.flush()?;
    reporter.finish();
    if let Some(path) = store.path() {
        reporter.note(&format!("Interrupted; saved {rows} rows to {}", path.display()));
    }
    Ok(())
}
