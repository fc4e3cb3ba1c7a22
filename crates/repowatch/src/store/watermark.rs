use chrono::{DateTime, Duration, Utc};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::activity::RecordKind;
use crate::entity::{commit, issue, pull_request, review};

use super::ActivityTable;
use super::errors::Result;

// ─── Watermarks ──────────────────────────────────────────────────────────────

/// Defining timestamp of the newest stored row of `E` for a repository.
pub async fn latest_timestamp<E: ActivityTable>(
    db: &DatabaseConnection,
    repository_id: i32,
) -> Result<Option<DateTime<Utc>>> {
    let newest = E::find()
        .filter(E::repository_column().eq(repository_id))
        .order_by_desc(E::timestamp_column())
        .one(db)
        .await?;
    Ok(newest.as_ref().map(E::row_timestamp))
}

/// Lower bound for a sync: `min(latest, now - retention_days)`.
///
/// With no stored rows the bound is `now - retention_days`, so every run
/// rescans at least the whole retention window.
pub fn effective_since(
    latest: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    retention_days: i64,
) -> DateTime<Utc> {
    let floor = now - Duration::days(retention_days);
    match latest {
        Some(latest) => latest.min(floor),
        None => floor,
    }
}

/// Effective lower bounds for each record kind of one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Watermarks {
    pub commits: DateTime<Utc>,
    pub pull_requests: DateTime<Utc>,
    pub issues: DateTime<Utc>,
    pub reviews: DateTime<Utc>,
}

impl Watermarks {
    pub async fn load(
        db: &DatabaseConnection,
        repository_id: i32,
        now: DateTime<Utc>,
        retention_days: i64,
    ) -> Result<Self> {
        let bound = |latest| effective_since(latest, now, retention_days);
        Ok(Self {
            commits: bound(latest_timestamp::<commit::Entity>(db, repository_id).await?),
            pull_requests: bound(
                latest_timestamp::<pull_request::Entity>(db, repository_id).await?,
            ),
            issues: bound(latest_timestamp::<issue::Entity>(db, repository_id).await?),
            reviews: bound(latest_timestamp::<review::Entity>(db, repository_id).await?),
        })
    }

    pub fn for_kind(&self, kind: RecordKind) -> DateTime<Utc> {
        match kind {
            RecordKind::Commit => self.commits,
            RecordKind::PullRequest => self.pull_requests,
            RecordKind::Issue => self.issues,
            RecordKind::Review => self.reviews,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn no_data_defaults_to_retention_floor() {
        let now = at(30);
        assert_eq!(effective_since(None, now, 30), now - Duration::days(30));
    }

    #[test]
    fn recent_data_is_clamped_down_to_floor() {
        let now = at(30);
        assert_eq!(
            effective_since(Some(at(29)), now, 30),
            now - Duration::days(30)
        );
    }

    #[test]
    fn older_data_keeps_its_own_timestamp() {
        let now = at(30);
        let old = now - Duration::days(45);
        assert_eq!(effective_since(Some(old), now, 30), old);
    }

    #[tokio::test]
    async fn latest_timestamp_reads_newest_row() {
        let row = commit::Model {
            id: 3,
            repository_id: 1,
            sha: Some("abc".into()),
            message: "m".into(),
            author: "x".into(),
            committed_at: at(10),
            branch: "main".into(),
            ingested_at: at(11),
        };
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![row]])
            .into_connection();

        let latest = latest_timestamp::<commit::Entity>(&db, 1)
            .await
            .expect("mock query should succeed");
        assert_eq!(latest, Some(at(10)));

        let log = db.into_transaction_log();
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("ORDER BY"));
        assert!(sql.contains("LIMIT"));
    }

    #[tokio::test]
    async fn watermarks_use_floor_for_empty_tables() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<commit::Model>::new()])
            .append_query_results([Vec::<pull_request::Model>::new()])
            .append_query_results([Vec::<issue::Model>::new()])
            .append_query_results([Vec::<review::Model>::new()])
            .into_connection();

        let now = at(30);
        let marks = Watermarks::load(&db, 7, now, 30).await.expect("load");
        let floor = now - Duration::days(30);
        for kind in RecordKind::ALL {
            assert_eq!(marks.for_kind(kind), floor);
        }
    }
}
