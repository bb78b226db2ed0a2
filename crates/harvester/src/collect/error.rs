//! Collection error types.

use thiserror::Error;

use crate::github::GitHubError;
use crate::store::StoreError;

/// Errors that end a bracket or the whole run.
#[derive(Debug, Error)]
pub enum CollectError {
    /// The API reported an error that is not a timeout.
    #[error("unexpected API error: {message}")]
    Api { message: String },

    /// A GitHub call failed in a way that cannot be retried.
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    /// A record store could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The reply is JSON but not a search page.
    #[error("could not decode search page: {0}")]
    Decode(String),

    /// A cap restart would not move the lower bound forward.
    #[error("cap restart at {attempted} stars makes no progress past {previous}")]
    CapStalled { previous: u64, attempted: u64 },
}

impl CollectError {
    /// Whether the run must stop.
    ///
    /// Non-fatal errors only end the current bracket.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode(_) | Self::CapStalled { .. })
    }
}
