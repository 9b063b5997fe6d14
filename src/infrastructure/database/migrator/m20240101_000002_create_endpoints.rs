//! Create endpoints table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Endpoints::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Endpoints::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Endpoints::Url).string().not_null())
                    .col(
                        ColumnDef::new(Endpoints::Status)
                            .string()
                            .not_null()
                            .default("unknown"),
                    )
                    .col(ColumnDef::new(Endpoints::OwnerId).big_integer().not_null())
                    .col(
                        ColumnDef::new(Endpoints::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Endpoints::StatusChangedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        // One row per (owner, url)
        manager
            .create_index(
                Index::create()
                    .name("idx_endpoints_owner_url")
                    .table(Endpoints::Table)
                    .col(Endpoints::OwnerId)
                    .col(Endpoints::Url)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Endpoints::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Endpoints {
    Table,
    Id,
    Url,
    Status,
    OwnerId,
    CreatedAt,
    StatusChangedAt,
}
