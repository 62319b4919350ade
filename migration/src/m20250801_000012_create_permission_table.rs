use sea_orm_migration::{prelude::*, schema::*};

use super::m20250801_000009_create_resource_type_table::ResourceType;
use crate::schema_version;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Permission::Table)
                    .if_not_exists()
                    .col(pk_uuid(Permission::Id))
                    .col(string_uniq(Permission::Key))
                    .col(string(Permission::Name))
                    .col(uuid_null(Permission::ResourceTypeId))
                    .col(timestamp_with_time_zone(Permission::CreatedAt))
                    .col(timestamp_with_time_zone(Permission::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-permission-resource-type")
                            .from(Permission::Table, Permission::ResourceTypeId)
                            .to(ResourceType::Table, ResourceType::Id),
                    )
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 12).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Permission::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Permission {
    Table,
    Id,
    Key,
    Name,
    ResourceTypeId,
    CreatedAt,
    UpdatedAt,
}
