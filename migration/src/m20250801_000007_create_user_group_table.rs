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
                    .table(UserGroup::Table)
                    .if_not_exists()
                    .col(pk_uuid(UserGroup::Id))
                    .col(string_uniq(UserGroup::Name))
                    .col(uuid(UserGroup::PrincipalId))
                    .col(timestamp_with_time_zone(UserGroup::CreatedAt))
                    .col(timestamp_with_time_zone(UserGroup::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-user-group-principal")
                            .from(UserGroup::Table, UserGroup::PrincipalId)
                            .to(Principal::Table, Principal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx-user-group-principal-unique")
                            .col(UserGroup::PrincipalId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 7).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserGroup::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum UserGroup {
    Table,
    Id,
    Name,
    PrincipalId,
    CreatedAt,
    UpdatedAt,
}
