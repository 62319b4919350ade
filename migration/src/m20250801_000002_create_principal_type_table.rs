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
                    .table(PrincipalType::Table)
                    .if_not_exists()
                    .col(pk_uuid(PrincipalType::Id))
                    .col(string_uniq(PrincipalType::Name))
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 2).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PrincipalType::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PrincipalType {
    Table,
    Id,
    Name,
}
