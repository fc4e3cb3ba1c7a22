use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;

use crate::entity::{commit, issue, pull_request, review};

use super::ActivityTable;
use super::errors::Result;

// ─── Retention ───────────────────────────────────────────────────────────────

/// Rows removed per kind by one prune.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub commits: u64,
    pub pull_requests: u64,
    pub issues: u64,
    pub reviews: u64,
}

impl PruneReport {
    pub fn total(&self) -> u64 {
        self.commits + self.pull_requests + self.issues + self.reviews
    }
}

async fn prune_table<E: ActivityTable>(
    db: &DatabaseConnection,
    repository_id: i32,
    cutoff: DateTime<Utc>,
) -> Result<u64> {
    let result = E::delete_many()
        .filter(E::repository_column().eq(repository_id))
        .filter(E::timestamp_column().lt(cutoff))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Delete every activity row of a repository whose defining timestamp is
/// strictly before `cutoff`. Rows exactly at the cutoff are kept.
pub async fn prune_older_than(
    db: &DatabaseConnection,
    repository_id: i32,
    cutoff: DateTime<Utc>,
) -> Result<PruneReport> {
    let report = PruneReport {
        commits: prune_table::<commit::Entity>(db, repository_id, cutoff).await?,
        pull_requests: prune_table::<pull_request::Entity>(db, repository_id, cutoff).await?,
        issues: prune_table::<issue::Entity>(db, repository_id, cutoff).await?,
        reviews: prune_table::<review::Entity>(db, repository_id, cutoff).await?,
    };

    if report.total() > 0 {
        tracing::info!(
            repository_id,
            commits = report.commits,
            pull_requests = report.pull_requests,
            issues = report.issues,
            reviews = report.reviews,
            "Pruned records past retention"
        );
    }
    Ok(report)
}

/// Prune with the cutoff `now - retention_days`.
pub async fn prune(
    db: &DatabaseConnection,
    repository_id: i32,
    now: DateTime<Utc>,
    retention_days: i64,
) -> Result<PruneReport> {
    prune_older_than(db, repository_id, now - Duration::days(retention_days)).await
}
