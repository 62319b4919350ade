use sea_orm_migration::{prelude::*, schema::*};

use super::m20250801_000003_create_principal_table::Principal;
use crate::schema_version;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceAccount::Table)
                    .if_not_exists()
                    .col(pk_uuid(ServiceAccount::Id))
                    .col(uuid(ServiceAccount::PrincipalId))
                    .col(string(ServiceAccount::ServiceName))
                    .col(timestamp_with_time_zone(ServiceAccount::CreatedAt))
                    .col(timestamp_with_time_zone(ServiceAccount::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-service-account-principal")
                            .from(ServiceAccount::Table, ServiceAccount::PrincipalId)
                            .to(Principal::Table, Principal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx-service-account-principal-unique")
                            .col(ServiceAccount::PrincipalId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 6).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ServiceAccount::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ServiceAccount {
    Table,
    Id,
    PrincipalId,
    ServiceName,
    CreatedAt,
    UpdatedAt,
}
