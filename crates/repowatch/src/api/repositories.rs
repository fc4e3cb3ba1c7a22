//! Repository listing, lookup, stats and the `addRepo` action.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use super::{AppState, error::ApiError};
use crate::entity::repository;
use crate::github::RepoName;
use crate::store::{self, RepositoryStats};
use crate::sync::{self, RepoSyncReport};

// ─── Queries ─────────────────────────────────────────────────────────────────

pub async fn list(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<repository::Model>>, ApiError> {
    let repos = store::list(&state.db)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch repositories", &e))?;
    Ok(Json(repos))
}

pub async fn get_one(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<repository::Model>, ApiError> {
    store::find_by_id(&state.db, id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch repository", &e))?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Repository not found".to_string()))
}

/// Counts for a repository id. Unknown ids report zeros.
pub async fn stats(
    State(state): State<Arc<AppState>>,
    Path(repository_id): Path<i32>,
) -> Result<Json<RepositoryStats>, ApiError> {
    let stats = store::repository_stats(&state.db, repository_id)
        .await
        .map_err(|e| ApiError::internal("Failed to fetch repository stats", &e))?;
    Ok(Json(stats))
}

// ─── addRepo ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRepoRequest {
    #[serde(default)]
    pub repo_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AddRepoResponse {
    pub success: bool,
    pub repository: repository::Model,
    pub sync: SyncSummary,
}

/// What the initial sync of a newly added repository stored.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub commits: usize,
    pub pull_requests: usize,
    pub issues: usize,
    pub reviews: usize,
    pub complete: bool,
}

impl From<&RepoSyncReport> for SyncSummary {
    fn from(report: &RepoSyncReport) -> Self {
        Self {
            commits: report.commits.inserted,
            pull_requests: report.pull_requests.inserted,
            issues: report.issues.inserted,
            reviews: report.reviews.inserted,
            complete: report.is_complete(),
        }
    }
}

/// Start tracking a repository and sync it before responding.
///
/// The name must exist upstream. When a tracking file is configured the
/// name is appended to it so the scheduler picks it up on later cycles.
pub async fn add(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AddRepoRequest>,
) -> Result<Json<AddRepoResponse>, ApiError> {
    let raw = body.repo_name.as_deref().map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(ApiError::BadRequest(
            "Repository name is required".to_string(),
        ));
    }
    let name = RepoName::parse(raw).map_err(|_| {
        ApiError::BadRequest("Invalid repository name format. Use owner/repo.".to_string())
    })?;
    let full_name = name.full_name();

    match state.client.get_repository(&name).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return Err(ApiError::NotFound(format!(
                "Repository {full_name} not found on GitHub"
            )));
        }
        Err(e) => {
            tracing::warn!(repository = %full_name, error = %e, "Upstream lookup failed");
            return Err(ApiError::BadGateway(
                "Could not reach GitHub to verify the repository".to_string(),
            ));
        }
    }

    if let Some(tracked) = &state.tracked {
        let added = tracked
            .add(&full_name)
            .await
            .map_err(|e| ApiError::internal("Failed to record repository", &e))?;
        if added {
            tracing::info!(repository = %full_name, path = %tracked.path().display(), "Added to tracking file");
        }
    }

    let report = sync::sync_repository(&state.client, &state.db, &full_name, &state.options, None)
        .await
        .map_err(|e| ApiError::internal("Failed to add repository", &e))?;

    let repository = store::find_by_id(&state.db, report.repository_id)
        .await
        .map_err(|e| ApiError::internal("Failed to add repository", &e))?
        .ok_or_else(|| ApiError::Internal("Failed to add repository".to_string()))?;

    Ok(Json(AddRepoResponse {
        success: true,
        sync: SyncSummary::from(&report),
        repository,
    }))
}
