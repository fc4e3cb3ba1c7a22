use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};

use crate::activity;
use crate::entity::repository::{ActiveModel, Column, Entity as Repository, Model};

use super::errors::{Result, StoreError};

// ─── Repository Rows ─────────────────────────────────────────────────────────

pub async fn find_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<Model>> {
    Ok(Repository::find()
        .filter(Column::Name.eq(name))
        .one(db)
        .await?)
}

pub async fn find_by_id(db: &DatabaseConnection, id: i32) -> Result<Option<Model>> {
    Ok(Repository::find_by_id(id).one(db).await?)
}

/// All repositories, newest first.
pub async fn list(db: &DatabaseConnection) -> Result<Vec<Model>> {
    Ok(Repository::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
        .all(db)
        .await?)
}

/// Look a repository up by name, creating it on first reference.
///
/// Safe against a concurrent creator: the insert ignores a name conflict and
/// the row is read back either way.
pub async fn get_or_create(db: &DatabaseConnection, name: &str) -> Result<Model> {
    if let Some(existing) = find_by_name(db, name).await? {
        return Ok(existing);
    }

    let model = ActiveModel {
        name: Set(name.to_string()),
        created_at: Set(activity::now()),
        ..Default::default()
    };
    Repository::insert(model)
        .on_conflict(OnConflict::column(Column::Name).do_nothing().to_owned())
        .exec_without_returning(db)
        .await?;

    let created = find_by_name(db, name)
        .await?
        .ok_or_else(|| StoreError::repository_not_found(name))?;
    tracing::info!(repo = %name, id = created.id, "Tracking new repository");
    Ok(created)
}
