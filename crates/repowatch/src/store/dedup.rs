use std::collections::{HashMap, HashSet};

use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

use crate::activity::{NaturalKey, NumberKey, RecordKind};
use crate::entity::{commit, issue, pull_request, review};

use super::ActivityTable;
use super::errors::Result;

/// Ids removed per DELETE statement by [`collapse_duplicates`].
pub const COLLAPSE_DELETE_CHUNK: usize = 100;

// ─── Dedup Against Stored Keys ───────────────────────────────────────────────

/// Natural keys of every stored row of `E` for a repository.
pub async fn existing_keys<E>(
    db: &DatabaseConnection,
    repository_id: i32,
) -> Result<HashSet<<E::Model as NaturalKey>::Key>>
where
    E: ActivityTable,
    E::Model: NaturalKey,
{
    let rows = E::find()
        .filter(E::repository_column().eq(repository_id))
        .all(db)
        .await?;
    Ok(rows.iter().map(NaturalKey::natural_key).collect())
}

/// Stored pull requests keyed by number, for in-place state refresh.
pub async fn existing_pull_requests(
    db: &DatabaseConnection,
    repository_id: i32,
) -> Result<HashMap<NumberKey, pull_request::Model>> {
    let rows = pull_request::Entity::find()
        .filter(pull_request::Column::RepositoryId.eq(repository_id))
        .order_by_asc(pull_request::Column::Id)
        .all(db)
        .await?;

    let mut by_key = HashMap::with_capacity(rows.len());
    for row in rows {
        by_key.entry(row.natural_key()).or_insert(row);
    }
    Ok(by_key)
}

/// Keep only candidates whose key is not in `seen`, recording each kept key.
///
/// A candidate whose fallback key is in `seen` counts as stored. Duplicates
/// inside `candidates` are dropped too: the first occurrence wins.
pub fn filter_new<T: NaturalKey>(candidates: Vec<T>, seen: &mut HashSet<T::Key>) -> Vec<T> {
    candidates
        .into_iter()
        .filter(|candidate| {
            if let Some(fallback) = candidate.fallback_key() {
                if seen.contains(&fallback) {
                    return false;
                }
            }
            seen.insert(candidate.natural_key())
        })
        .collect()
}

// ─── Collapse Maintenance ────────────────────────────────────────────────────

/// Delete all but the lowest-id row of every natural-key group of `E` for a
/// repository. Returns the number of rows deleted.
pub async fn collapse_duplicates<E>(db: &DatabaseConnection, repository_id: i32) -> Result<u64>
where
    E: ActivityTable,
    E::Model: NaturalKey,
{
    let rows = E::find()
        .filter(E::repository_column().eq(repository_id))
        .order_by_asc(E::id_column())
        .all(db)
        .await?;

    let redundant = redundant_ids(&rows, E::row_id);
    if redundant.is_empty() {
        return Ok(0);
    }

    let mut deleted = 0;
    for chunk in redundant.chunks(COLLAPSE_DELETE_CHUNK) {
        let result = E::delete_many()
            .filter(E::id_column().is_in(chunk.iter().copied()))
            .exec(db)
            .await?;
        deleted += result.rows_affected;
    }

    tracing::info!(
        kind = %E::KIND,
        repository_id,
        deleted,
        "Collapsed duplicate rows"
    );
    Ok(deleted)
}

/// [`collapse_duplicates`] dispatched on a runtime kind.
pub async fn collapse_kind(
    db: &DatabaseConnection,
    repository_id: i32,
    kind: RecordKind,
) -> Result<u64> {
    match kind {
        RecordKind::Commit => collapse_duplicates::<commit::Entity>(db, repository_id).await,
        RecordKind::PullRequest => {
            collapse_duplicates::<pull_request::Entity>(db, repository_id).await
        }
        RecordKind::Issue => collapse_duplicates::<issue::Entity>(db, repository_id).await,
        RecordKind::Review => collapse_duplicates::<review::Entity>(db, repository_id).await,
    }
}

/// Ids of every row that is not the lowest-id member of its key group.
fn redundant_ids<M: NaturalKey>(rows: &[M], row_id: impl Fn(&M) -> i32) -> Vec<i32> {
    let mut keeper: HashMap<M::Key, i32> = HashMap::with_capacity(rows.len());
    let mut redundant = Vec::new();

    for row in rows {
        let id = row_id(row);
        match keeper.get_mut(&row.natural_key()) {
            Some(kept) if *kept <= id => redundant.push(id),
            Some(kept) => {
                redundant.push(*kept);
                *kept = id;
            }
            None => {
                keeper.insert(row.natural_key(), id);
            }
        }
    }

    redundant.sort_unstable();
    redundant
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::NewCommit;
    use chrono::{TimeZone, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn stored_commit(id: i32, message: &str) -> commit::Model {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        commit::Model {
            id,
            repository_id: 1,
            sha: None,
            message: message.to_string(),
            author: "x".to_string(),
            committed_at: t,
            branch: "main".to_string(),
            ingested_at: t,
        }
    }

    fn fetched_commit(message: &str) -> NewCommit {
        NewCommit {
            repository_id: 1,
            sha: None,
            message: message.to_string(),
            author: "x".to_string(),
            committed_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            branch: "main".to_string(),
        }
    }

    #[test]
    fn filter_new_emits_only_unseen_commits() {
        let mut seen: HashSet<_> = [stored_commit(1, "a").natural_key()].into();
        let fresh = filter_new(vec![fetched_commit("a"), fetched_commit("b")], &mut seen);
        assert_eq!(fresh, vec![fetched_commit("b")]);
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn filter_new_matches_sha_commits_against_legacy_rows() {
        let mut seen: HashSet<_> = [stored_commit(1, "a").natural_key()].into();
        let mut with_sha = fetched_commit("a");
        with_sha.sha = Some("abc".into());
        let mut other = fetched_commit("b");
        other.sha = Some("def".into());

        let fresh = filter_new(vec![with_sha, other.clone()], &mut seen);
        assert_eq!(fresh, vec![other]);
    }

    #[test]
    fn filter_new_drops_in_batch_duplicates() {
        let mut seen = HashSet::new();
        let fresh = filter_new(
            vec![fetched_commit("a"), fetched_commit("a"), fetched_commit("b")],
            &mut seen,
        );
        assert_eq!(fresh.len(), 2);
    }

    #[test]
    fn redundant_ids_keep_lowest_id_per_group() {
        let rows = vec![
            stored_commit(5, "a"),
            stored_commit(2, "a"),
            stored_commit(3, "b"),
            stored_commit(9, "a"),
        ];
        assert_eq!(redundant_ids(&rows, |r| r.id), vec![5, 9]);
    }

    #[tokio::test]
    async fn collapse_deletes_duplicates_and_reports_count() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![
                stored_commit(1, "a"),
                stored_commit(2, "a"),
                stored_commit(3, "a"),
                stored_commit(4, "b"),
            ]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            }])
            .into_connection();

        let deleted = collapse_duplicates::<commit::Entity>(&db, 1)
            .await
            .expect("collapse");
        assert_eq!(deleted, 2);

        let log = db.into_transaction_log();
        assert_eq!(log.len(), 2);
        assert!(format!("{:?}", log[1]).contains("DELETE"));
    }

    #[tokio::test]
    async fn collapse_without_duplicates_issues_no_delete() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([vec![stored_commit(1, "a"), stored_commit(2, "b")]])
            .into_connection();

        let deleted = collapse_duplicates::<commit::Entity>(&db, 1)
            .await
            .expect("collapse");
        assert_eq!(deleted, 0);
        assert_eq!(db.into_transaction_log().len(), 1);
    }
}
