//! Pull request entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::pull_request_state::PullRequestState;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pull_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub repository_id: i32,
    /// Upstream PR number, unique within the repository.
    pub number: i64,
    #[sea_orm(column_type = "Text")]
    pub title: String,
    pub author: String,
    pub state: PullRequestState,
    /// When the PR was opened upstream.
    pub created_at: DateTimeUtc,
    pub ingested_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::repository::Entity",
        from = "Column::RepositoryId",
        to = "super::repository::Column::Id",
        on_delete = "Cascade"
    )]
    Repository,
}

impl Related<super::repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
