//! Persistence for repositories and their activity records.
//!
//! Every function takes the database handle explicitly. Activity tables share
//! a shape (repository reference, defining timestamp, natural key), captured
//! by [`ActivityTable`] so watermark, dedup and prune logic is written once.

mod dedup;
mod errors;
mod insert;
mod prune;
mod query;
mod repositories;
mod watermark;

use chrono::{DateTime, Utc};
use sea_orm::EntityTrait;

use crate::activity::RecordKind;
use crate::entity::{commit, issue, pull_request, review};

pub use dedup::{
    COLLAPSE_DELETE_CHUNK, collapse_duplicates, collapse_kind, existing_keys,
    existing_pull_requests, filter_new,
};
pub use errors::{Result, StoreError};
pub use insert::{
    DEFAULT_INSERT_BATCH_SIZE, InsertOutcome, REVIEW_INSERT_BATCH_SIZE, insert_with_fallback,
    update_pull_request,
};
pub use prune::{PruneReport, prune, prune_older_than};
pub use query::{
    ActivityFilter, ActivityItem, MAX_AUTHORS, RepositoryStats, activity, distinct_authors,
    repository_stats,
};
pub use repositories::{find_by_id, find_by_name, get_or_create, list};
pub use watermark::{Watermarks, effective_since, latest_timestamp};

/// An activity table: rows belong to one repository and carry one defining
/// timestamp used for watermarks, retention and date filters.
pub trait ActivityTable: EntityTrait {
    const KIND: RecordKind;

    fn id_column() -> Self::Column;
    fn repository_column() -> Self::Column;
    fn author_column() -> Self::Column;
    fn timestamp_column() -> Self::Column;
    fn row_id(model: &Self::Model) -> i32;
    fn row_timestamp(model: &Self::Model) -> DateTime<Utc>;
}

impl ActivityTable for commit::Entity {
    const KIND: RecordKind = RecordKind::Commit;

    fn id_column() -> commit::Column {
        commit::Column::Id
    }
    fn repository_column() -> commit::Column {
        commit::Column::RepositoryId
    }
    fn author_column() -> commit::Column {
        commit::Column::Author
    }
    fn timestamp_column() -> commit::Column {
        commit::Column::CommittedAt
    }
    fn row_id(model: &commit::Model) -> i32 {
        model.id
    }
    fn row_timestamp(model: &commit::Model) -> DateTime<Utc> {
        model.committed_at
    }
}

impl ActivityTable for pull_request::Entity {
    const KIND: RecordKind = RecordKind::PullRequest;

    fn id_column() -> pull_request::Column {
        pull_request::Column::Id
    }
    fn repository_column() -> pull_request::Column {
        pull_request::Column::RepositoryId
    }
    fn author_column() -> pull_request::Column {
        pull_request::Column::Author
    }
    fn timestamp_column() -> pull_request::Column {
        pull_request::Column::CreatedAt
    }
    fn row_id(model: &pull_request::Model) -> i32 {
        model.id
    }
    fn row_timestamp(model: &pull_request::Model) -> DateTime<Utc> {
        model.created_at
    }
}

impl ActivityTable for issue::Entity {
    const KIND: RecordKind = RecordKind::Issue;

    fn id_column() -> issue::Column {
        issue::Column::Id
    }
    fn repository_column() -> issue::Column {
        issue::Column::RepositoryId
    }
    fn author_column() -> issue::Column {
        issue::Column::Author
    }
    fn timestamp_column() -> issue::Column {
        issue::Column::CreatedAt
    }
    fn row_id(model: &issue::Model) -> i32 {
        model.id
    }
    fn row_timestamp(model: &issue::Model) -> DateTime<Utc> {
        model.created_at
    }
}

impl ActivityTable for review::Entity {
    const KIND: RecordKind = RecordKind::Review;

    fn id_column() -> review::Column {
        review::Column::Id
    }
    fn repository_column() -> review::Column {
        review::Column::RepositoryId
    }
    fn author_column() -> review::Column {
        review::Column::Author
    }
    fn timestamp_column() -> review::Column {
        review::Column::SubmittedAt
    }
    fn row_id(model: &review::Model) -> i32 {
        model.id
    }
    fn row_timestamp(model: &review::Model) -> DateTime<Utc> {
        model.submitted_at
    }
}
