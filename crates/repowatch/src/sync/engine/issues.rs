use chrono::{DateTime, Utc};

use super::super::error::Result;
use super::super::progress::{SyncProgress, emit};
use super::super::types::KindCounts;
use super::persist::persist;
use super::{RepoContext, note_incomplete};
use crate::activity::{NewIssue, RecordKind};
use crate::entity::issue;
use crate::github::convert::to_new_issue;
use crate::github::repo::list_issues;
use crate::store::{existing_keys, filter_new};

/// Fetch issues updated since `since` and store the new ones created inside
/// the window. Pull requests returned by the issues endpoint are skipped.
pub(super) async fn sync_issues(
    ctx: &RepoContext<'_>,
    since: DateTime<Utc>,
    errors: &mut Vec<String>,
) -> Result<KindCounts> {
    let page = list_issues(ctx.client, ctx.repo, since).await;
    note_incomplete(&page, "issues", errors);

    let candidates: Vec<NewIssue> = page
        .items
        .iter()
        .filter_map(|item| to_new_issue(item, ctx.repository_id))
        .filter(|i| i.created_at >= since)
        .collect();

    let mut seen = existing_keys::<issue::Entity>(ctx.db, ctx.repository_id).await?;
    let fetched = candidates.len();
    let fresh = filter_new(candidates, &mut seen);

    emit(
        ctx.on_progress,
        SyncProgress::Fetched {
            repository: ctx.name(),
            kind: RecordKind::Issue,
            count: fetched,
            new: fresh.len(),
        },
    );

    let new = fresh.len();
    let models = fresh
        .into_iter()
        .map(|i| i.into_active_model(ctx.now))
        .collect();
    let outcome = persist(ctx, RecordKind::Issue, models, ctx.options.insert_batch_size).await;

    Ok(KindCounts {
        fetched,
        new,
        inserted: outcome.inserted,
        failed: outcome.failed,
        updated: 0,
    })
}
