use sea_orm_migration::{prelude::*, schema::*};

use super::m20250801_000003_create_principal_table::Principal;
use super::m20250801_000007_create_user_group_table::UserGroup;
use crate::schema_version;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserGroupMembership::Table)
                    .if_not_exists()
                    .col(uuid(UserGroupMembership::PrincipalId))
                    .col(uuid(UserGroupMembership::UserGroupId))
                    .col(timestamp_with_time_zone(UserGroupMembership::CreatedAt))
                    .primary_key(
                        Index::create()
                            .col(UserGroupMembership::PrincipalId)
                            .col(UserGroupMembership::UserGroupId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-membership-principal")
                            .from(UserGroupMembership::Table, UserGroupMembership::PrincipalId)
                            .to(Principal::Table, Principal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-membership-user-group")
                            .from(UserGroupMembership::Table, UserGroupMembership::UserGroupId)
                            .to(UserGroup::Table, UserGroup::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 8).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserGroupMembership::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum UserGroupMembership {
    Table,
    PrincipalId,
    UserGroupId,
    CreatedAt,
}
