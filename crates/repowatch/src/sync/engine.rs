//! Per-repository sync pipeline and the cycle driver around it.
//!
//! One repository runs through fixed, sequential stages:
//!
//! ```text
//! prune -> collapse duplicates -> commits -> pull requests -> issues -> reviews
//! ```
//!
//! Each fetch stage pages the upstream API from the stage's watermark, drops
//! what is already stored and bulk-inserts the rest. Upstream failures never
//! abort a repository: partial results are kept and the failure is recorded
//! on the [`RepoSyncReport`]. Store failures do abort it, and [`sync_all`]
//! moves on to the next repository.
//!
//! # Example
//!
//! ```ignore
//! use repowatch::sync::{SyncOptions, sync_repository};
//!
//! let report = sync_repository(&client, &db, "rust-lang/rust", &SyncOptions::default(), None).await?;
//! println!("{} new commits", report.commits.inserted);
//! ```

mod commits;
mod issues;
mod persist;
mod pulls;
mod reviews;

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;

use super::error::{Result, SyncError};
use super::progress::{ProgressCallback, SyncProgress, emit};
use super::types::{CycleReport, RepoOutcome, RepoSyncReport, SyncOptions};
use crate::activity::{self, RecordKind};
use crate::github::{GitHubClient, Paginated, RepoName};
use crate::store::{self, Watermarks};

pub use pulls::PullRequestLists;
pub use reviews::review_candidates;

/// Kinds collapsed during the maintenance pass, in order.
const COLLAPSED_KINDS: [RecordKind; 3] = [
    RecordKind::Commit,
    RecordKind::Review,
    RecordKind::PullRequest,
];

/// Everything a stage needs about the repository being synced.
pub(super) struct RepoContext<'a> {
    pub client: &'a GitHubClient,
    pub db: &'a DatabaseConnection,
    pub repo: &'a RepoName,
    pub repository_id: i32,
    pub options: &'a SyncOptions,
    pub now: DateTime<Utc>,
    pub on_progress: Option<&'a ProgressCallback>,
}

impl RepoContext<'_> {
    pub fn name(&self) -> String {
        self.repo.full_name()
    }
}

/// Record a fetch that stopped early. The items it did return are still used.
pub(super) fn note_incomplete<T>(page: &Paginated<T>, what: &str, errors: &mut Vec<String>) {
    if let Some(e) = &page.error {
        errors.push(format!("{what}: {e} (kept {} items)", page.items.len()));
    }
}

/// Sync one repository end to end.
///
/// Creates the repository row on first sight. Returns an error only when the
/// name is malformed or the store fails; upstream problems are reported on
/// [`RepoSyncReport::errors`].
#[tracing::instrument(skip(client, db, options, on_progress), fields(repository = %repository))]
pub async fn sync_repository(
    client: &GitHubClient,
    db: &DatabaseConnection,
    repository: &str,
    options: &SyncOptions,
    on_progress: Option<&ProgressCallback>,
) -> Result<RepoSyncReport> {
    let repo =
        RepoName::parse(repository).map_err(|e| SyncError::InvalidRepository(e.to_string()))?;
    let name = repo.full_name();
    emit(
        on_progress,
        SyncProgress::RepositoryStarted {
            repository: name.clone(),
        },
    );

    let row = store::get_or_create(db, &name).await?;
    let now = activity::now();
    let mut report = RepoSyncReport {
        repository: name.clone(),
        repository_id: row.id,
        ..Default::default()
    };

    report.pruned = store::prune(db, row.id, now, options.retention_days).await?;
    emit(
        on_progress,
        SyncProgress::Pruned {
            repository: name.clone(),
            report: report.pruned,
        },
    );

    for kind in COLLAPSED_KINDS {
        let deleted = store::collapse_kind(db, row.id, kind).await?;
        report.collapsed += deleted;
        if deleted > 0 {
            emit(
                on_progress,
                SyncProgress::Collapsed {
                    repository: name.clone(),
                    kind,
                    deleted,
                },
            );
        }
    }

    let marks = Watermarks::load(db, row.id, now, options.retention_days).await?;
    tracing::debug!(
        commits_since = %marks.commits,
        pull_requests_since = %marks.pull_requests,
        issues_since = %marks.issues,
        reviews_since = %marks.reviews,
        "Loaded watermarks"
    );

    let ctx = RepoContext {
        client,
        db,
        repo: &repo,
        repository_id: row.id,
        options,
        now,
        on_progress,
    };

    report.commits = commits::sync_commits(&ctx, marks.commits, &mut report.errors).await?;
    let (pr_counts, pull_lists) =
        pulls::sync_pull_requests(&ctx, marks.pull_requests, &mut report.errors).await?;
    report.pull_requests = pr_counts;
    report.issues = issues::sync_issues(&ctx, marks.issues, &mut report.errors).await?;
    report.reviews =
        reviews::sync_reviews(&ctx, &pull_lists, marks.reviews, &mut report.errors).await?;

    tracing::info!(
        commits = report.commits.inserted,
        pull_requests = report.pull_requests.inserted,
        pull_requests_updated = report.pull_requests.updated,
        issues = report.issues.inserted,
        reviews = report.reviews.inserted,
        pruned = report.pruned.total(),
        collapsed = report.collapsed,
        errors = report.errors.len(),
        "Repository synced"
    );
    emit(
        on_progress,
        SyncProgress::RepositoryComplete {
            repository: name,
            inserted: report.inserted(),
            errors: report.errors.len(),
        },
    );

    Ok(report)
}

/// Sync every repository in order, isolating failures per repository.
pub async fn sync_all(
    client: &GitHubClient,
    db: &DatabaseConnection,
    repositories: &[String],
    options: &SyncOptions,
    on_progress: Option<&ProgressCallback>,
) -> CycleReport {
    let never = AtomicBool::new(false);
    sync_all_until(client, db, repositories, options, &never, on_progress).await
}

/// [`sync_all`] that stops before the next repository once `cancel` is set.
///
/// The repository in flight when the flag flips runs to completion.
#[tracing::instrument(skip_all, fields(repository_count = repositories.len()))]
pub async fn sync_all_until(
    client: &GitHubClient,
    db: &DatabaseConnection,
    repositories: &[String],
    options: &SyncOptions,
    cancel: &AtomicBool,
    on_progress: Option<&ProgressCallback>,
) -> CycleReport {
    emit(
        on_progress,
        SyncProgress::CycleStarted {
            repositories: repositories.len(),
        },
    );

    let mut cycle = CycleReport::default();

    for repository in repositories {
        if cancel.load(Ordering::Acquire) {
            tracing::warn!(
                remaining = repositories.len() - cycle.outcomes.len(),
                "Shutdown requested, stopping sync cycle"
            );
            cycle.cancelled = true;
            break;
        }

        let result = sync_repository(client, db, repository, options, on_progress).await;
        if let Err(e) = &result {
            tracing::error!(
                repository = %repository,
                error = %e,
                "Repository sync failed, continuing with next repository"
            );
            emit(
                on_progress,
                SyncProgress::RepositoryFailed {
                    repository: repository.clone(),
                    error: e.to_string(),
                },
            );
        }
        cycle.outcomes.push(RepoOutcome {
            repository: repository.clone(),
            result,
        });
    }

    let failed = cycle.failed().count();
    emit(
        on_progress,
        SyncProgress::CycleComplete {
            succeeded: cycle.outcomes.len() - failed,
            failed,
            cancelled: cycle.cancelled,
        },
    );
    tracing::info!(
        succeeded = cycle.outcomes.len() - failed,
        failed,
        inserted = cycle.inserted(),
        "Sync cycle complete"
    );

    cycle
}
