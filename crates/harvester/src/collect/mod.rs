//! Repository collectors.
//!
//! The starred-repository collector pages a GraphQL search across star
//! brackets larger than the API's per-query result cap. The code-search and
//! details collectors build the second dataset the intersection works on.
//!
//! # Module Structure
//!
//! - [`aimd`] - Page-size control
//! - [`state`] - Per-bracket pagination state
//! - `controller` - One bracket, one request at a time
//! - `supervisor` - The outer loop over brackets, flushing and recovery
//! - [`by_code`] - Fingerprint code search
//! - [`details`] - Per-repository details
//! - `progress` - Progress events
//! - `error` - Error types
//!
//! # Example
//!
//! ```ignore
//! use harvester::collect::{ControllerConfig, StarCollector};
//! use harvester::query::BracketPlan;
//! use harvester::store::RecordStore;
//!
//! let config = ControllerConfig::default();
//! let mut store = RecordStore::repositories().open("resources/projects.csv")?;
//! let summary = StarCollector::new(&client, &config)
//!     .run(&BracketPlan::default(), &mut store)
//!     .await?;
//! ```

pub mod aimd;
pub mod by_code;
mod controller;
pub mod details;
mod error;
mod progress;
pub mod state;
mod supervisor;
mod types;

pub use aimd::{AimdLimits, PageSizeController};
pub use by_code::{CodeSearchCollector, CodeSearchConfig, CodeSearchSummary};
pub use controller::StarCollector;
pub use details::{DetailsCollector, DetailsConfig, DetailsSummary};
pub use error::CollectError;
pub use progress::{CollectProgress, ProgressCallback, emit};
pub use state::PaginationState;
pub use types::{
    BracketSummary, COURTESY_DELAY, ControllerConfig, RECOVERY_DELAY, RESTART_OVERLAP,
    RESULT_CAP, RunSummary, Step,
};
