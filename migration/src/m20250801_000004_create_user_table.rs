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
                    .table(AppUser::Table)
                    .if_not_exists()
                    .col(pk_uuid(AppUser::Id))
                    .col(uuid(AppUser::PrincipalId))
                    .col(string(AppUser::Email))
                    .col(string_null(AppUser::DisplayName))
                    .col(timestamp_with_time_zone(AppUser::CreatedAt))
                    .col(timestamp_with_time_zone(AppUser::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-app-user-principal")
                            .from(AppUser::Table, AppUser::PrincipalId)
                            .to(Principal::Table, Principal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx-app-user-principal-unique")
                            .col(AppUser::PrincipalId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 4).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AppUser::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AppUser {
    Table,
    Id,
    PrincipalId,
    Email,
    DisplayName,
    CreatedAt,
    UpdatedAt,
}
