use sea_orm_migration::{prelude::*, schema::*};

use super::m20250801_000002_create_principal_type_table::PrincipalType;
use crate::schema_version;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Principal::Table)
                    .if_not_exists()
                    .col(pk_uuid(Principal::Id))
                    .col(uuid(Principal::PrincipalTypeId))
                    .col(string(Principal::DisplayName))
                    .col(uuid_null(Principal::OrganizationId))
                    .col(string_null(Principal::ExternalRef))
                    .col(timestamp_with_time_zone(Principal::CreatedAt))
                    .col(timestamp_with_time_zone(Principal::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-principal-principal-type")
                            .from(Principal::Table, Principal::PrincipalTypeId)
                            .to(PrincipalType::Table, PrincipalType::Id),
                    )
                    .index(Index::create().name("idx-principal-type").col(Principal::PrincipalTypeId))
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 3).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Principal::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Principal {
    Table,
    Id,
    PrincipalTypeId,
    DisplayName,
    OrganizationId,
    ExternalRef,
    CreatedAt,
    UpdatedAt,
}
