use sea_orm_migration::{prelude::*, schema::*};

use crate::schema_version;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SqlzibarSchema::Table)
                    .if_not_exists()
                    .col(integer(SqlzibarSchema::Id).primary_key())
                    .col(integer(SqlzibarSchema::Version).not_null())
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 1).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SqlzibarSchema::Table).to_owned())
            .await
    }
}

/// Single-row bookkeeping table; row `Id = 1` holds the current version.
/// One row per deployment is an application invariant enforced by
/// `CoreSeeder`, not a database constraint.
#[derive(DeriveIden)]
enum SqlzibarSchema {
    Table,
    Id,
    Version,
}
