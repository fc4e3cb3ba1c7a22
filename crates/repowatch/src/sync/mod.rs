//! Ingestion pipeline: per-repository sync and the cycle driver.
//!
//! # Module Structure
//!
//! - [`types`] - `SyncOptions`, `RepoSyncReport`, `CycleReport`, constants
//! - [`progress`] - Progress reporting: `SyncProgress`, `ProgressCallback`, `emit()`
//! - [`engine`] - The staged pipeline: `sync_repository()`, `sync_all()`
//!
//! # Example
//!
//! ```ignore
//! use repowatch::sync::{SyncOptions, sync_all};
//!
//! let repos = vec!["rust-lang/rust".to_string(), "tokio-rs/tokio".to_string()];
//! let cycle = sync_all(&client, &db, &repos, &SyncOptions::default(), None).await;
//! for (name, err) in cycle.failed() {
//!     eprintln!("{name}: {err}");
//! }
//! ```

pub mod engine;
mod error;
mod progress;
mod types;


pub use error::{Result, SyncError};

pub use types::{
    CycleReport, KindCounts, RepoOutcome, RepoSyncReport, SyncOptions,
    DEFAULT_BRANCH_CONCURRENCY, DEFAULT_REVIEW_BATCH_SIZE,
};

pub use progress::{ProgressCallback, SyncProgress, emit};

pub use engine::{
    PullRequestLists, review_candidates, sync_all, sync_all_until, sync_repository,
};
