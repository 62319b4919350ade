use sea_orm_migration::{prelude::*, schema::*};

use super::m20250801_000003_create_principal_table::Principal;
use super::m20250801_000010_create_resource_table::Resource;
use super::m20250801_000011_create_role_table::Role;
use crate::schema_version;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Grant::Table)
                    .if_not_exists()
                    .col(pk_uuid(Grant::Id))
                    .col(uuid(Grant::PrincipalId))
                    .col(uuid(Grant::ResourceId))
                    .col(uuid(Grant::RoleId))
                    .col(timestamp_with_time_zone_null(Grant::EffectiveFrom))
                    .col(timestamp_with_time_zone_null(Grant::EffectiveTo))
                    .col(timestamp_with_time_zone(Grant::CreatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-grant-principal")
                            .from(Grant::Table, Grant::PrincipalId)
                            .to(Principal::Table, Principal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-grant-resource")
                            .from(Grant::Table, Grant::ResourceId)
                            .to(Resource::Table, Resource::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-grant-role")
                            .from(Grant::Table, Grant::RoleId)
                            .to(Role::Table, Role::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // the hottest read path: resolving anchor grants for
                    // a principal set restricted to a role set.
                    .index(
                        Index::create()
                            .name("idx-grant-principal-role")
                            .col(Grant::PrincipalId)
                            .col(Grant::RoleId),
                    )
                    .index(Index::create().name("idx-grant-resource").col(Grant::ResourceId))
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 14).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Grant::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Grant {
    Table,
    Id,
    PrincipalId,
    ResourceId,
    RoleId,
    EffectiveFrom,
    EffectiveTo,
    CreatedAt,
}
