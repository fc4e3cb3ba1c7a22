use std::collections::HashSet;

use chrono::{DateTime, Utc};

use super::super::error::Result;
use super::super::progress::{SyncProgress, emit};
use super::super::types::KindCounts;
use super::persist::persist;
use super::{RepoContext, note_incomplete};
use crate::activity::{NaturalKey, NewPullRequest, RecordKind};
use crate::entity::PullRequestState;
use crate::github::convert::to_new_pull_request;
use crate::github::repo::list_pulls;
use crate::store::{existing_pull_requests, filter_new, update_pull_request};

/// Pull requests as listed upstream, before the creation-date window is
/// applied. Reused to pick review candidates.
#[derive(Debug, Default)]
pub struct PullRequestLists {
    pub open: Vec<NewPullRequest>,
    pub closed: Vec<NewPullRequest>,
}

/// Fetch open then closed pull requests and store those created since
/// `since`. Stored pull requests whose state or title changed are refreshed
/// when the options ask for it.
pub(super) async fn sync_pull_requests(
    ctx: &RepoContext<'_>,
    since: DateTime<Utc>,
    errors: &mut Vec<String>,
) -> Result<(KindCounts, PullRequestLists)> {
    let mut lists = PullRequestLists::default();

    for state in [PullRequestState::Open, PullRequestState::Closed] {
        let page = list_pulls(ctx.client, ctx.repo, state).await;
        note_incomplete(&page, &format!("{state} pull requests"), errors);

        let converted: Vec<NewPullRequest> = page
            .items
            .iter()
            .map(|item| to_new_pull_request(item, ctx.repository_id))
            .collect();
        match state {
            PullRequestState::Open => lists.open = converted,
            PullRequestState::Closed => lists.closed = converted,
        }
    }

    let candidates: Vec<NewPullRequest> = lists
        .open
        .iter()
        .chain(lists.closed.iter())
        .filter(|pr| pr.created_at >= since)
        .cloned()
        .collect();
    let fetched = candidates.len();

    let stored = existing_pull_requests(ctx.db, ctx.repository_id).await?;
    let (known, unknown): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|pr| stored.contains_key(&pr.natural_key()));

    let mut updated = 0;
    if ctx.options.refresh_pr_state {
        let mut refreshed = HashSet::new();
        for pr in &known {
            let key = pr.natural_key();
            let Some(row) = stored.get(&key) else {
                continue;
            };
            if (row.state == pr.state && row.title == pr.title) || !refreshed.insert(key) {
                continue;
            }
            update_pull_request(ctx.db, row.id, &pr.title, pr.state).await?;
            tracing::debug!(
                number = pr.number,
                from = %row.state,
                to = %pr.state,
                "Refreshed pull request"
            );
            updated += 1;
        }
    }

    let mut seen = stored.keys().copied().collect();
    let fresh = filter_new(unknown, &mut seen);

    emit(
        ctx.on_progress,
        SyncProgress::Fetched {
            repository: ctx.name(),
            kind: RecordKind::PullRequest,
            count: fetched,
            new: fresh.len(),
        },
    );

    let new = fresh.len();
    let models = fresh
        .into_iter()
        .map(|pr| pr.into_active_model(ctx.now))
        .collect();
    let outcome = persist(
        ctx,
        RecordKind::PullRequest,
        models,
        ctx.options.insert_batch_size,
    )
    .await;

    Ok((
        KindCounts {
            fetched,
            new,
            inserted: outcome.inserted,
            failed: outcome.failed,
            updated,
        },
        lists,
    ))
}
