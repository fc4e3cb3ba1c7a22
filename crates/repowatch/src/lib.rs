//! Repowatch - GitHub activity ingestion and query service.
//!
//! This library polls the GitHub REST API for commits, pull requests, issues
//! and reviews of a set of tracked repositories, stores them in a relational
//! database and serves them back through a small HTTP query API.
//!
//! # Features
//!
//! - `sqlite` / `postgres` - Database backends (both enabled by default).
//! - `migrate` - Enables database migration support. When enabled, you can use
//!   [`connect_and_migrate`] to create the schema on connection.
//!
//! # Example
//!
//! ```ignore
//! use repowatch::{connect_and_migrate, github::GitHubClient, sync};
//!
//! let db = connect_and_migrate("sqlite://repowatch.db?mode=rwc").await?;
//! let client = GitHubClient::new(&token)?;
//!
//! let report = sync::sync_all(&client, &db, &["rust-lang/rust".into()], &Default::default(), None).await;
//! println!("{} repositories failed", report.failed().count());
//! ```

pub mod activity;
pub mod api;
pub mod db;
pub mod entity;
pub mod github;
pub mod http;
pub mod retry;
pub mod store;
pub mod sync;
pub mod tracked;

#[cfg(feature = "migrate")]
pub mod migration;

pub use activity::RecordKind;
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use store::StoreError;
