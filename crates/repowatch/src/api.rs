//! JSON query API for the dashboard.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/api/repositories` | Newest first |
//! | `GET`  | `/api/repository/{id}` | 404 if not found |
//! | `GET`  | `/api/users` | Up to 500 commit authors |
//! | `GET`  | `/api/activity` | Merged feed, see [`activity::ActivityParams`] |
//! | `GET`  | `/api/stats/{repositoryId}` | Row counts per kind |
//! | `POST` | `/api/addRepo` | Body: `{"repoName":"owner/repo"}` |
//!
//! Errors are `{"error": "<short message>"}`; store and upstream detail is
//! logged, never returned.

pub mod activity;
pub mod error;
pub mod repositories;


use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sea_orm::DatabaseConnection;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::github::GitHubClient;
use crate::sync::SyncOptions;
use crate::tracked::TrackedRepositories;

pub use error::ApiError;

/// Shared handler state.
pub struct AppState {
    pub db: DatabaseConnection,
    pub client: GitHubClient,
    pub options: SyncOptions,
    /// Where `addRepo` records new repositories, if anywhere.
    pub tracked: Option<TrackedRepositories>,
}

/// Build the API router. CORS is permissive: the dashboard is served from
/// another origin.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/repositories", get(repositories::list))
        .route("/api/repository/{id}", get(repositories::get_one))
        .route("/api/stats/{repository_id}", get(repositories::stats))
        .route("/api/addRepo", post(repositories::add))
        .route("/api/users", get(activity::users))
        .route("/api/activity", get(activity::feed))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
