use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::super::error::Result;
use super::super::progress::{SyncProgress, emit};
use super::super::types::KindCounts;
use super::persist::persist;
use super::pulls::PullRequestLists;
use super::{RepoContext, note_incomplete};
use crate::activity::{NewReview, RecordKind};
use crate::entity::review;
use crate::github::convert::to_new_review;
use crate::github::repo::list_reviews;
use crate::store::{existing_keys, filter_new};

/// Pull request numbers whose reviews are fetched: every open PR plus closed
/// PRs updated at or after `since`. Order follows the upstream listing and
/// each number appears once.
pub fn review_candidates(lists: &PullRequestLists, since: DateTime<Utc>) -> Vec<i64> {
    let mut seen = HashSet::new();
    lists
        .open
        .iter()
        .chain(lists.closed.iter().filter(|pr| pr.updated_at >= since))
        .map(|pr| pr.number)
        .filter(|n| seen.insert(*n))
        .collect()
}

/// Fetch reviews of candidate pull requests in batches, checking the quota
/// before each batch, then store the new ones submitted since `since`.
pub(super) async fn sync_reviews(
    ctx: &RepoContext<'_>,
    lists: &PullRequestLists,
    since: DateTime<Utc>,
    errors: &mut Vec<String>,
) -> Result<KindCounts> {
    let candidates = review_candidates(lists, since);
    tracing::debug!(
        candidates = candidates.len(),
        open = lists.open.len(),
        "Selected pull requests for review fetch"
    );

    let mut seen = existing_keys::<review::Entity>(ctx.db, ctx.repository_id).await?;
    let mut fetched = 0;
    let mut fresh: Vec<NewReview> = Vec::new();

    let batch_size = ctx.options.review_batch_size.max(1);
    let total_batches = candidates.len().div_ceil(batch_size);

    for (index, batch) in candidates.chunks(batch_size).enumerate() {
        emit(
            ctx.on_progress,
            SyncProgress::ReviewBatch {
                repository: ctx.name(),
                batch: index + 1,
                total_batches,
                pr_numbers: batch.to_vec(),
            },
        );
        ctx.client.wait_for_quota().await;

        let handles: Vec<_> = batch
            .iter()
            .map(|&number| {
                let client = ctx.client.clone();
                let repo = ctx.repo.clone();
                tokio::spawn(async move { (number, list_reviews(&client, &repo, number).await) })
            })
            .collect();

        for handle in handles {
            match handle.await {
                Ok((number, page)) => {
                    note_incomplete(&page, &format!("reviews of #{number}"), errors);
                    let reviews: Vec<NewReview> = page
                        .items
                        .iter()
                        .map(|item| to_new_review(item, ctx.repository_id, number))
                        .filter(|r| r.submitted_at >= since)
                        .collect();
                    fetched += reviews.len();
                    fresh.extend(filter_new(reviews, &mut seen));
                }
                Err(e) => errors.push(format!("reviews: task failed: {e}")),
            }
        }
    }

    emit(
        ctx.on_progress,
        SyncProgress::Fetched {
            repository: ctx.name(),
            kind: RecordKind::Review,
            count: fetched,
            new: fresh.len(),
        },
    );

    let new = fresh.len();
    let models = fresh
        .into_iter()
        .map(|r| r.into_active_model(ctx.now))
        .collect();
    let outcome = persist(
        ctx,
        RecordKind::Review,
        models,
        ctx.options.review_insert_batch_size,
    )
    .await;

    Ok(KindCounts {
        fetched,
        new,
        inserted: outcome.inserted,
        failed: outcome.failed,
        updated: 0,
    })
}
