use thiserror::Error;

use crate::store::StoreError;

/// Errors that abort one repository's sync.
///
/// Upstream fetch failures never end up here: a fetch that gives up keeps its
/// partial results and is recorded on the report instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Invalid repository name: {0}")]
    InvalidRepository(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

pub type Result<T> = std::result::Result<T, SyncError>;
