use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel};

use super::super::progress::{SyncProgress, emit};
use super::RepoContext;
use crate::activity::RecordKind;
use crate::store::{InsertOutcome, insert_with_fallback};

/// Bulk insert new rows for one kind and report the outcome.
pub(super) async fn persist<A>(
    ctx: &RepoContext<'_>,
    kind: RecordKind,
    models: Vec<A>,
    batch_size: usize,
) -> InsertOutcome
where
    A: ActiveModelTrait + Clone + Send + Sync,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
{
    if models.is_empty() {
        tracing::debug!(kind = %kind, "Nothing new to store");
        return InsertOutcome::default();
    }

    let outcome = insert_with_fallback(ctx.db, kind, models, batch_size).await;
    if outcome.failed > 0 {
        tracing::warn!(
            kind = %kind,
            inserted = outcome.inserted,
            failed = outcome.failed,
            "Some rows could not be stored"
        );
    }
    emit(
        ctx.on_progress,
        SyncProgress::Persisted {
            repository: ctx.name(),
            kind,
            inserted: outcome.inserted,
            failed: outcome.failed,
        },
    );
    outcome
}
