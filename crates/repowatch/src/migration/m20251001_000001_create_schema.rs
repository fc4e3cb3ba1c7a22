//! Initial migration: repositories plus the four activity tables.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        self.create_repositories(manager).await?;
        self.create_commits(manager).await?;
        self.create_pull_requests(manager).await?;
        self.create_issues(manager).await?;
        self.create_reviews(manager).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Reviews::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Issues::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PullRequests::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Commits::Table).if_exists().to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Repositories::Table).if_exists().to_owned())
            .await?;
        Ok(())
    }
}

/// Auto-increment integer primary key named `id`.
fn id_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .integer()
        .not_null()
        .auto_increment()
        .primary_key()
        .to_owned()
}

fn timestamp_column<T: IntoIden>(col: T) -> ColumnDef {
    ColumnDef::new(col)
        .timestamp_with_time_zone()
        .not_null()
        .to_owned()
}

/// Cascade FK from an activity table to `repositories.id`.
fn repository_fk<T: IntoIden + Copy + 'static>(
    name: &str,
    table: T,
    column: T,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, column)
        .to(Repositories::Table, Repositories::Id)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
}

impl Migration {
    async fn create_repositories(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repositories::Table)
                    .if_not_exists()
                    .col(id_column(Repositories::Id))
                    .col(
                        ColumnDef::new(Repositories::Name)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(timestamp_column(Repositories::CreatedAt))
                    .to_owned(),
            )
            .await
    }

    async fn create_commits(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Commits::Table)
                    .if_not_exists()
                    .col(id_column(Commits::Id))
                    .col(ColumnDef::new(Commits::RepositoryId).integer().not_null())
                    .col(ColumnDef::new(Commits::Sha).string_len(64).null())
                    .col(ColumnDef::new(Commits::Message).text().not_null())
                    .col(ColumnDef::new(Commits::Author).string().not_null())
                    .col(timestamp_column(Commits::CommittedAt))
                    .col(ColumnDef::new(Commits::Branch).string().not_null())
                    .col(timestamp_column(Commits::IngestedAt))
                    .foreign_key(&mut repository_fk(
                        "fk_commits_repository",
                        Commits::Table,
                        Commits::RepositoryId,
                    ))
                    .to_owned(),
            )
            .await?;

        // Watermark and prune both scan by (repository, commit time)
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_commits_repository_committed_at")
                    .table(Commits::Table)
                    .col(Commits::RepositoryId)
                    .col(Commits::CommittedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_commits_author")
                    .table(Commits::Table)
                    .col(Commits::Author)
                    .to_owned(),
            )
            .await
    }

    async fn create_pull_requests(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PullRequests::Table)
                    .if_not_exists()
                    .col(id_column(PullRequests::Id))
                    .col(
                        ColumnDef::new(PullRequests::RepositoryId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PullRequests::Number).big_integer().not_null())
                    .col(ColumnDef::new(PullRequests::Title).text().not_null())
                    .col(ColumnDef::new(PullRequests::Author).string().not_null())
                    .col(ColumnDef::new(PullRequests::State).string_len(16).not_null())
                    .col(timestamp_column(PullRequests::CreatedAt))
                    .col(timestamp_column(PullRequests::IngestedAt))
                    .foreign_key(&mut repository_fk(
                        "fk_pull_requests_repository",
                        PullRequests::Table,
                        PullRequests::RepositoryId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pull_requests_repository_number")
                    .table(PullRequests::Table)
                    .col(PullRequests::RepositoryId)
                    .col(PullRequests::Number)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pull_requests_repository_created_at")
                    .table(PullRequests::Table)
                    .col(PullRequests::RepositoryId)
                    .col(PullRequests::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn create_issues(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Issues::Table)
                    .if_not_exists()
                    .col(id_column(Issues::Id))
                    .col(ColumnDef::new(Issues::RepositoryId).integer().not_null())
                    .col(ColumnDef::new(Issues::Number).big_integer().not_null())
                    .col(ColumnDef::new(Issues::Title).text().not_null())
                    .col(ColumnDef::new(Issues::Author).string().not_null())
                    .col(timestamp_column(Issues::CreatedAt))
                    .col(timestamp_column(Issues::IngestedAt))
                    .foreign_key(&mut repository_fk(
                        "fk_issues_repository",
                        Issues::Table,
                        Issues::RepositoryId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_issues_repository_created_at")
                    .table(Issues::Table)
                    .col(Issues::RepositoryId)
                    .col(Issues::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn create_reviews(&self, manager: &SchemaManager<'_>) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Reviews::Table)
                    .if_not_exists()
                    .col(id_column(Reviews::Id))
                    .col(ColumnDef::new(Reviews::RepositoryId).integer().not_null())
                    .col(ColumnDef::new(Reviews::ReviewId).big_integer().not_null())
                    .col(ColumnDef::new(Reviews::PrNumber).big_integer().not_null())
                    .col(ColumnDef::new(Reviews::Author).string().not_null())
                    .col(ColumnDef::new(Reviews::Comment).text().not_null())
                    .col(timestamp_column(Reviews::SubmittedAt))
                    .col(timestamp_column(Reviews::IngestedAt))
                    .foreign_key(&mut repository_fk(
                        "fk_reviews_repository",
                        Reviews::Table,
                        Reviews::RepositoryId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reviews_repository_review_id")
                    .table(Reviews::Table)
                    .col(Reviews::RepositoryId)
                    .col(Reviews::ReviewId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reviews_repository_submitted_at")
                    .table(Reviews::Table)
                    .col(Reviews::RepositoryId)
                    .col(Reviews::SubmittedAt)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden, Clone, Copy)]
enum Repositories {
    Table,
    Id,
    Name,
    CreatedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Commits {
    Table,
    Id,
    RepositoryId,
    Sha,
    Message,
    Author,
    CommittedAt,
    Branch,
    IngestedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum PullRequests {
    Table,
    Id,
    RepositoryId,
    Number,
    Title,
    Author,
    State,
    CreatedAt,
    IngestedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Issues {
    Table,
    Id,
    RepositoryId,
    Number,
    Title,
    Author,
    CreatedAt,
    IngestedAt,
}

#[derive(DeriveIden, Clone, Copy)]
enum Reviews {
    Table,
    Id,
    RepositoryId,
    ReviewId,
    PrNumber,
    Author,
    Comment,
    SubmittedAt,
    IngestedAt,
}
