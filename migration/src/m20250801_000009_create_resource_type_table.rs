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
                    .table(ResourceType::Table)
                    .if_not_exists()
                    .col(pk_uuid(ResourceType::Id))
                    .col(string_uniq(ResourceType::Name))
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 9).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ResourceType::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ResourceType {
    Table,
    Id,
    Name,
}
