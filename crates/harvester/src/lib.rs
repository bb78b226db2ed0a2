//! Harvester - collects metadata about RPA-related GitHub repositories.
//!
//! The GitHub search caps every query at 1000 results. The star collector
//! works around the cap by splitting the star range into brackets, paging
//! each bracket in ascending star order and restarting the query just below
//! the highest star count seen whenever the cap is reached. Page sizes adapt
//! to server timeouts with an additive-increase/multiplicative-decrease rule.
//!
//! Auxiliary collectors search code for RPA fingerprints, fetch per-repository
//! details, intersect datasets and list configuration files.
//!
//! All datasets are flat CSV tables keyed by repository identity; see
//! [`store::RecordStore`].
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use harvester::collect::{ControllerConfig, StarCollector};
//! use harvester::github::GitHubClient;
//! use harvester::http::reqwest_transport::ReqwestTransport;
//! use harvester::query::BracketPlan;
//! use harvester::store::RecordStore;
//!
//! let transport = ReqwestTransport::with_timeout(Duration::from_secs(60))?;
//! let client = GitHubClient::new(Arc::new(transport), token);
//! let config = ControllerConfig::default();
//! let mut store = RecordStore::repositories().open("resources/projects.csv")?;
//!
//! let summary = StarCollector::new(&client, &config)
//!     .run(&BracketPlan::default(), &mut store)
//!     .await?;
//! ```

pub mod collect;
pub mod github;
pub mod http;
pub mod intersect;
pub mod query;
pub mod rate_limit;
pub mod record;
pub mod retry;
pub mod store;

pub use collect::{CollectError, CollectProgress, ProgressCallback, StarCollector};
pub use github::{GitHubClient, GitHubError};
pub use http::{HttpError, HttpTransport};
pub use intersect::{IntersectSummary, intersect, intersect_files};
pub use query::{BracketPlan, SearchFilter, build_filter};
pub use rate_limit::ApiRateLimiter;
pub use record::{FieldValue, RepositoryRecord};
pub use store::{IdentityKey, RecordStore, StoreError};
