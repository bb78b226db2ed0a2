//! Classification of raw search responses.
//!
//! A search reply can carry several signals at once: a `Retry-After` header,
//! an `errors` list and a `data` payload. Classification keeps all of them so
//! the pagination controller can act on each in turn.

use std::time::Duration;

use crate::http::HttpResponse;

use super::error::{GitHubError, status_error};
use super::types::{GraphQlResponse, SearchData};

/// What the body of a search response turned out to be.
#[derive(Debug, Clone)]
pub enum SearchBody {
    /// Not JSON at all (HTML error page, empty body, truncated stream).
    Malformed { status: u16, reason: &'static str },
    /// A GraphQL envelope.
    Parsed(GraphQlResponse<SearchData>),
}

/// A classified search response.
#[derive(Debug, Clone)]
pub struct SearchReply {
    /// Mandatory wait announced by the server.
    pub retry_after: Option<Duration>,
    pub body: SearchBody,
}

/// Read the rate-limit header, logging values that cannot be honored.
pub fn retry_after_of(response: &HttpResponse) -> Option<Duration> {
    let raw = response.header("retry-after")?;
    let parsed = response.retry_after();
    if parsed.is_none() {
        tracing::warn!(value = raw, "Ignoring unparseable Retry-After header");
    }
    parsed
}

/// Classify a search response.
///
/// JSON that does not match the search schema is an error; a body that is not
/// JSON is reported as [`SearchBody::Malformed`] so the caller can retry.
pub fn classify_search(response: &HttpResponse) -> Result<SearchReply, GitHubError> {
    let retry_after = retry_after_of(response);

    let value: serde_json::Value = match serde_json::from_slice(&response.body) {
        Ok(value) => value,
        Err(_) => {
            return Ok(SearchReply {
                retry_after,
                body: SearchBody::Malformed {
                    status: response.status,
                    reason: response.reason(),
                },
            });
        }
    };

    let parsed: GraphQlResponse<SearchData> =
        serde_json::from_value(value).map_err(GitHubError::decode)?;

    // A refusal without payload is only retried when it is a rate limit.
    if !response.is_success()
        && parsed.data.is_none()
        && parsed.first_error().is_none()
        && retry_after.is_none()
        && response.status != 403
        && response.status != 429
    {
        return Err(status_error(response.status, response.reason(), None));
    }

    Ok(SearchReply {
        retry_after,
        body: SearchBody::Parsed(parsed),
    })
}
