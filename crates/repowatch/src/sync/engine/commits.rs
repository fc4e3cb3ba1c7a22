use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;

use super::super::error::Result;
use super::super::progress::{SyncProgress, emit};
use super::super::types::KindCounts;
use super::persist::persist;
use super::{RepoContext, note_incomplete};
use crate::activity::{NewCommit, RecordKind};
use crate::entity::commit;
use crate::github::convert::to_new_commit;
use crate::github::repo::{list_branches, list_commits};
use crate::github::types::CommitItem;
use crate::store::{existing_keys, filter_new};

/// Fetch commits on every branch since `since`, then store the new ones.
pub(super) async fn sync_commits(
    ctx: &RepoContext<'_>,
    since: DateTime<Utc>,
    errors: &mut Vec<String>,
) -> Result<KindCounts> {
    let branches = list_branches(ctx.client, ctx.repo).await;
    note_incomplete(&branches, "branches", errors);
    let branch_names: Vec<String> = branches.into_items().into_iter().map(|b| b.name).collect();

    let per_branch = fetch_branch_commits(ctx, branch_names, since, errors).await;

    // The upstream `since` filter is not exact; apply it again.
    let candidates: Vec<NewCommit> = per_branch
        .iter()
        .flat_map(|(branch, items)| {
            items
                .iter()
                .map(|item| to_new_commit(item, ctx.repository_id, branch))
        })
        .filter(|c| c.committed_at >= since)
        .collect();

    let mut seen = existing_keys::<commit::Entity>(ctx.db, ctx.repository_id).await?;
    let fetched = candidates.len();
    let fresh = filter_new(candidates, &mut seen);

    emit(
        ctx.on_progress,
        SyncProgress::Fetched {
            repository: ctx.name(),
            kind: RecordKind::Commit,
            count: fetched,
            new: fresh.len(),
        },
    );

    let new = fresh.len();
    let models = fresh
        .into_iter()
        .map(|c| c.into_active_model(ctx.now))
        .collect();
    let outcome = persist(ctx, RecordKind::Commit, models, ctx.options.insert_batch_size).await;

    Ok(KindCounts {
        fetched,
        new,
        inserted: outcome.inserted,
        failed: outcome.failed,
        updated: 0,
    })
}

/// One task per branch, at most `branch_concurrency` in flight. Results come
/// back in branch order.
async fn fetch_branch_commits(
    ctx: &RepoContext<'_>,
    branches: Vec<String>,
    since: DateTime<Utc>,
    errors: &mut Vec<String>,
) -> Vec<(String, Vec<CommitItem>)> {
    if branches.is_empty() {
        return Vec::new();
    }

    let concurrency = ctx.options.branch_concurrency.clamp(1, branches.len());
    let semaphore = Arc::new(Semaphore::new(concurrency));

    emit(
        ctx.on_progress,
        SyncProgress::FetchingBranches {
            repository: ctx.name(),
            branches: branches.len(),
            concurrency,
        },
    );
    tracing::debug!(branches = branches.len(), concurrency, "Fetching commits per branch");

    let mut handles = Vec::with_capacity(branches.len());

    for branch in branches {
        let client = ctx.client.clone();
        let repo = ctx.repo.clone();
        let semaphore = Arc::clone(&semaphore);

        let handle = tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return (branch, None),
            };
            let commits = list_commits(&client, &repo, &branch, since).await;
            (branch, Some(commits))
        });

        handles.push(handle);
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        match handle.await {
            Ok((branch, Some(commits))) => {
                note_incomplete(&commits, &format!("commits on {branch}"), errors);
                results.push((branch, commits.into_items()));
            }
            Ok((branch, None)) => {
                errors.push(format!("commits on {branch}: semaphore closed unexpectedly"));
            }
            Err(e) => errors.push(format!("commits: branch task failed: {e}")),
        }
    }
    results
}
