//! GitHub API access.
//!
//! # Module Structure
//!
//! - [`client`] - Authenticated client for GraphQL and REST endpoints
//! - [`error`] - Error types for GitHub API operations
//! - [`response`] - Classification of raw search responses
//! - [`tree`] - Config-file discovery in repository trees
//! - [`types`] - Request and response data structures

mod client;
mod error;
pub mod response;
pub mod tree;
pub mod types;

pub use client::{CODE_SEARCH_PER_PAGE, DEFAULT_API_URL, GitHubClient};
pub use error::GitHubError;
pub use response::{SearchBody, SearchReply, classify_search};
pub use tree::{CONFIG_FILE_PATTERNS, list_config_files};
