use std::cmp::Reverse;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use serde::Serialize;

use crate::activity::RecordKind;
use crate::entity::{PullRequestState, commit, issue, pull_request, repository, review};

use super::ActivityTable;
use super::errors::Result;

/// Cap on the number of authors returned by [`distinct_authors`].
pub const MAX_AUTHORS: u64 = 500;

// ─── Query Operations ────────────────────────────────────────────────────────

/// Distinct commit authors, alphabetically, at most [`MAX_AUTHORS`].
pub async fn distinct_authors(db: &DatabaseConnection) -> Result<Vec<String>> {
    let authors = commit::Entity::find()
        .select_only()
        .column(commit::Column::Author)
        .distinct()
        .order_by_asc(commit::Column::Author)
        .limit(MAX_AUTHORS)
        .into_tuple::<String>()
        .all(db)
        .await?;
    Ok(authors)
}

/// Stored row counts per kind for one repository.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStats {
    pub commits: u64,
    pub issues: u64,
    pub pull_requests: u64,
    pub reviews: u64,
}

async fn count_for<E: ActivityTable>(db: &DatabaseConnection, repository_id: i32) -> Result<u64>
where
    E::Model: Sync + 'static,
{
    Ok(E::find()
        .filter(E::repository_column().eq(repository_id))
        .count(db)
        .await?)
}

pub async fn repository_stats(
    db: &DatabaseConnection,
    repository_id: i32,
) -> Result<RepositoryStats> {
    let (commits, issues, pull_requests, reviews) = tokio::try_join!(
        count_for::<commit::Entity>(db, repository_id),
        count_for::<issue::Entity>(db, repository_id),
        count_for::<pull_request::Entity>(db, repository_id),
        count_for::<review::Entity>(db, repository_id),
    )?;
    Ok(RepositoryStats {
        commits,
        issues,
        pull_requests,
        reviews,
    })
}

// ─── Activity Feed ───────────────────────────────────────────────────────────

/// Filters for the merged activity feed. Empty lists mean "no filter"; date
/// bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    pub repositories: Vec<String>,
    pub authors: Vec<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// One row of the merged feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityItem {
    pub id: i32,
    pub repo_name: String,
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub author: String,
    pub created_at: DateTime<Utc>,
    /// Commits only.
    pub branch: Option<String>,
    /// Commit message, PR or issue title, or review comment.
    pub message: String,
    /// Pull requests only.
    pub state: Option<PullRequestState>,
}

fn filtered<E: ActivityTable>(filter: &ActivityFilter, repository_ids: Option<&[i32]>) -> Select<E> {
    let mut select = E::find();
    if let Some(ids) = repository_ids {
        select = select.filter(E::repository_column().is_in(ids.iter().copied()));
    }
    if !filter.authors.is_empty() {
        select = select.filter(E::author_column().is_in(filter.authors.iter().cloned()));
    }
    if let Some(from) = filter.from {
        select = select.filter(E::timestamp_column().gte(from));
    }
    if let Some(to) = filter.to {
        select = select.filter(E::timestamp_column().lte(to));
    }
    select.order_by_desc(E::timestamp_column())
}

/// Commits, pull requests, issues and reviews matching `filter`, newest first.
pub async fn activity(db: &DatabaseConnection, filter: &ActivityFilter) -> Result<Vec<ActivityItem>> {
    let names: HashMap<i32, String> = repository::Entity::find()
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    let repository_ids: Option<Vec<i32>> = if filter.repositories.is_empty() {
        None
    } else {
        let ids: Vec<i32> = names
            .iter()
            .filter(|(_, name)| filter.repositories.contains(name))
            .map(|(id, _)| *id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        Some(ids)
    };
    let ids = repository_ids.as_deref();
    let repo_name = |id: i32| names.get(&id).cloned().unwrap_or_default();

    let mut items = Vec::new();

    for c in filtered::<commit::Entity>(filter, ids).all(db).await? {
        items.push(ActivityItem {
            id: c.id,
            repo_name: repo_name(c.repository_id),
            kind: RecordKind::Commit,
            author: c.author,
            created_at: c.committed_at,
            branch: Some(c.branch),
            message: c.message,
            state: None,
        });
    }
    for p in filtered::<pull_request::Entity>(filter, ids).all(db).await? {
        items.push(ActivityItem {
            id: p.id,
            repo_name: repo_name(p.repository_id),
            kind: RecordKind::PullRequest,
            author: p.author,
            created_at: p.created_at,
            branch: None,
            message: p.title,
            state: Some(p.state),
        });
    }
    for i in filtered::<issue::Entity>(filter, ids).all(db).await? {
        items.push(ActivityItem {
            id: i.id,
            repo_name: repo_name(i.repository_id),
            kind: RecordKind::Issue,
            author: i.author,
            created_at: i.created_at,
            branch: None,
            message: i.title,
            state: None,
        });
    }
    for r in filtered::<review::Entity>(filter, ids).all(db).await? {
        items.push(ActivityItem {
            id: r.id,
            repo_name: repo_name(r.repository_id),
            kind: RecordKind::Review,
            author: r.author,
            created_at: r.submitted_at,
            branch: None,
            message: r.comment,
            state: None,
        });
    }

    items.sort_by_key(|item| Reverse((item.created_at, item.id)));
    Ok(items)
}
