//! GitHub API error types.

use std::time::Duration;

use thiserror::Error;

use crate::http::HttpError;

/// Errors that can occur when talking to the GitHub API.
#[derive(Debug, Error)]
pub enum GitHubError {
    /// The request never produced a response.
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),

    /// The API answered with a non-success status.
    #[error("GitHub returned {status} {reason}")]
    Status { status: u16, reason: &'static str },

    /// Primary or secondary rate limit hit (403/429).
    #[error("Rate limit exceeded (status {status})")]
    RateLimited {
        status: u16,
        retry_after: Option<Duration>,
    },

    /// The body is JSON but does not have the expected shape.
    #[error("Unexpected response shape: {0}")]
    Decode(String),

    /// The GraphQL endpoint reported errors.
    #[error("GitHub API error: {message}")]
    Api { message: String },
}

impl GitHubError {
    #[inline]
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    #[inline]
    pub fn decode(message: impl ToString) -> Self {
        Self::Decode(message.to_string())
    }

    /// Check if this error is a rate limit error (retryable after a pause).
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Check if this error is a transport hiccup worth retrying as-is.
    #[inline]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Http(HttpError::Transport(_)))
    }
}

/// Map a failed REST status to an error, flagging rate limits.
pub(crate) fn status_error(
    status: u16,
    reason: &'static str,
    retry_after: Option<Duration>,
) -> GitHubError {
    if status == 403 || status == 429 {
        GitHubError::RateLimited {
            status,
            retry_after,
        }
    } else {
        GitHubError::Status { status, reason }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_and_too_many_requests_are_rate_limits() {
        assert!(status_error(403, "Forbidden", None).is_rate_limited());
        assert!(status_error(429, "Too Many Requests", None).is_rate_limited());
        assert!(!status_error(404, "Not Found", None).is_rate_limited());
        assert!(!status_error(502, "Bad Gateway", None).is_rate_limited());
    }

    #[test]
    fn only_transport_failures_are_transient() {
        assert!(GitHubError::Http(HttpError::Transport("reset".into())).is_transient());
        assert!(!GitHubError::Http(HttpError::Encode("bad".into())).is_transient());
        assert!(!GitHubError::api("boom").is_transient());
        assert!(!GitHubError::decode("shape").is_transient());
    }

    #[test]
    fn messages_are_readable() {
        let err = status_error(502, "Bad Gateway", None);
        assert_eq!(err.to_string(), "GitHub returned 502 Bad Gateway");
        assert_eq!(
            GitHubError::api("Something went wrong").to_string(),
            "GitHub API error: Something went wrong"
        );
    }
}
