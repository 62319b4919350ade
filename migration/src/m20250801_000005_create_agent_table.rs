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
                    .table(Agent::Table)
                    .if_not_exists()
                    .col(pk_uuid(Agent::Id))
                    .col(uuid(Agent::PrincipalId))
                    .col(string(Agent::AgentKey))
                    .col(string_null(Agent::Description))
                    .col(timestamp_with_time_zone(Agent::CreatedAt))
                    .col(timestamp_with_time_zone(Agent::UpdatedAt))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-agent-principal")
                            .from(Agent::Table, Agent::PrincipalId)
                            .to(Principal::Table, Principal::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx-agent-principal-unique")
                            .col(Agent::PrincipalId)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;
        schema_version::advance(manager, 5).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Agent::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Agent {
    Table,
    Id,
    PrincipalId,
    AgentKey,
    Description,
    CreatedAt,
    UpdatedAt,
}
