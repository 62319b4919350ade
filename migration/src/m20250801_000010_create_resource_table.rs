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
                    .table(Resource::Table)
                    .if_not_exists()
                    .col(pk_uuid(Resource::Id))
                    .col(uuid_null(Resource::ParentId))
                    .col(string(Resource::Name))
                    .col(uuid(Resource::ResourceTypeId))
                    .col(boolean(Resource::IsActive).default(true))
                    .col(timestamp_with_time_zone(Resource::CreatedAt))
                    .col(timestamp_with_time_zone(Resource::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-resource-parent")
                            .from(Resource::Table, Resource::ParentId)
                            .to(Resource::Table, Resource::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-resource-resource-type")
                            .from(Resource::Table, Resource::ResourceTypeId)
                            .to(ResourceType::Table, ResourceType::Id),
                    )
                    .index(Index::create().name("idx-resource-parent").col(Resource::ParentId))
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 10).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Resource::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Resource {
    Table,
    Id,
    ParentId,
    Name,
    ResourceTypeId,
    IsActive,
    CreatedAt,
    UpdatedAt,
}
