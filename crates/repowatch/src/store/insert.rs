use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    Set,
};

use crate::activity::RecordKind;
use crate::entity::prelude::*;

use super::errors::Result;

// ─── Bulk Insert With Fallback ───────────────────────────────────────────────

/// Chunk size for commits, pull requests and issues.
pub const DEFAULT_INSERT_BATCH_SIZE: usize = 500;

/// Chunk size for reviews.
pub const REVIEW_INSERT_BATCH_SIZE: usize = 20;

/// Rows written and rows given up on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[must_use]
pub struct InsertOutcome {
    pub inserted: usize,
    pub failed: usize,
}

impl InsertOutcome {
    pub fn merge(&mut self, other: InsertOutcome) {
        self.inserted += other.inserted;
        self.failed += other.failed;
    }
}

/// Insert `models` in chunks of `batch_size`, one multi-row INSERT per chunk.
///
/// When a chunk fails as a whole, each of its rows is inserted on its own so
/// one bad row (a constraint violation, say) costs only itself. Per-row
/// failures are logged and counted, never returned.
pub async fn insert_with_fallback<A>(
    db: &DatabaseConnection,
    kind: RecordKind,
    models: Vec<A>,
    batch_size: usize,
) -> InsertOutcome
where
    A: ActiveModelTrait + Clone + Send + Sync,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    let mut outcome = InsertOutcome::default();

    for chunk in models.chunks(batch_size.max(1)) {
        let bulk = <A::Entity as EntityTrait>::insert_many(chunk.to_vec())
            .exec_without_returning(db)
            .await;

        match bulk {
            Ok(_) => outcome.inserted += chunk.len(),
            Err(e) => {
                tracing::warn!(
                    kind = %kind,
                    count = chunk.len(),
                    error = %e,
                    "Bulk insert failed, falling back to single-row inserts"
                );
                outcome.merge(insert_one_by_one(db, kind, chunk).await);
            }
        }
    }

    if outcome.inserted > 0 || outcome.failed > 0 {
        tracing::debug!(
            kind = %kind,
            inserted = outcome.inserted,
            failed = outcome.failed,
            "Insert complete"
        );
    }
    outcome
}

async fn insert_one_by_one<A>(db: &DatabaseConnection, kind: RecordKind, rows: &[A]) -> InsertOutcome
where
    A: ActiveModelTrait + Clone + Send + Sync,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    let mut outcome = InsertOutcome::default();
    for row in rows {
        match <A::Entity as EntityTrait>::insert(row.clone())
            .exec_without_returning(db)
            .await
        {
            Ok(_) => outcome.inserted += 1,
            Err(e) => {
                outcome.failed += 1;
                tracing::warn!(kind = %kind, error = %e, "Skipping row that failed to insert");
            }
        }
    }
    outcome
}

/// Overwrite the mutable fields of a stored pull request.
pub async fn update_pull_request(
    db: &DatabaseConnection,
    id: i32,
    title: &str,
    state: PullRequestState,
) -> Result<u64> {
    let result = PullRequest::update_many()
        .set(PullRequestActiveModel {
            title: Set(title.to_string()),
            state: Set(state),
            ..Default::default()
        })
        .filter(PullRequestColumn::Id.eq(id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
