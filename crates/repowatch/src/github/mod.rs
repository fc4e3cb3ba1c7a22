//! GitHub REST client for activity ingestion.
//!
//! # Module Structure
//!
//! - [`error`] - Fetch error taxonomy
//! - [`client`] - The rate-limited fetcher
//! - [`pagination`] - Page-number paginator
//! - [`rate_limit`] - Quota telemetry, low-water waits and request pacing
//! - [`repo`] - Repository-scoped endpoints
//! - [`types`] - REST payloads
//! - [`convert`] - Payload to activity record conversion

pub mod client;
pub mod convert;
pub mod error;
pub mod pagination;
pub mod rate_limit;
pub mod repo;
pub mod types;

pub use client::{DEFAULT_API_URL, GitHubClient};
pub use error::{FetchError, short_error_message};
pub use pagination::{PAGE_SIZE, Paginated, fetch_all};
pub use rate_limit::{ApiRateLimiter, GITHUB_DEFAULT_RPS, LOW_WATER_MARK, RateLimitInfo};
pub use repo::RepoName;
