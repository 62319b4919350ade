use sea_orm_migration::prelude::*;

use crate::schema_version;

/// Deploys `fn_is_resource_accessible`, the store-side composable form of
/// the downward closure. The cascade itself is type-agnostic; a
/// permission's `resource_type_id` is applied once, as a final
/// membership filter on `target_resource_id`, never during traversal —
/// the same two-step shape as `access::ResourceAccessResolver`'s
/// in-process `filter_by_resource_type`, so the two forms stay
/// equivalent. Always present in the schema once this migration has
/// run; hosts that leave `initializeFunctions` false simply never ask
/// [`sqlzibar::access::ResourceAccessResolver`] to reference it, so the
/// schema manager does not need a second, conditional migration path.
#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(
            "CREATE OR REPLACE FUNCTION fn_is_resource_accessible( \
                target_resource_id uuid, \
                principal_ids uuid[], \
                permission_id uuid \
            ) RETURNS boolean AS $$ \
            WITH RECURSIVE anchors AS ( \
                SELECT g.resource_id \
                FROM \"grant\" g \
                JOIN role_permission rp ON rp.role_id = g.role_id \
                WHERE rp.permission_id = permission_id \
                  AND g.principal_id = ANY(principal_ids) \
                  AND (g.effective_from IS NULL OR g.effective_from <= now()) \
                  AND (g.effective_to IS NULL OR g.effective_to > now()) \
            ), descendants AS ( \
                SELECT id FROM anchors \
                UNION ALL \
                SELECT r.id FROM resource r \
                INNER JOIN descendants d ON r.parent_id = d.id \
            ), permission_scope AS ( \
                SELECT resource_type_id FROM permission WHERE id = permission_id \
            ) \
            SELECT EXISTS ( \
                SELECT 1 \
                FROM descendants d \
                JOIN resource r ON r.id = d.id \
                WHERE d.id = target_resource_id \
                  AND ( \
                      (SELECT resource_type_id FROM permission_scope) IS NULL \
                      OR r.resource_type_id = (SELECT resource_type_id FROM permission_scope) \
                  ) \
            ); \
            $$ LANGUAGE sql STABLE;",
        )
        .await?;
        schema_version::advance(manager, 15).await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .get_connection()
            .execute_unprepared("DROP FUNCTION IF EXISTS fn_is_resource_accessible(uuid, uuid[], uuid);")
            .await?;
        Ok(())
    }
}
