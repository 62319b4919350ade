use sea_orm_migration::prelude::*;

/// Advances the single-row `sqlzibar_schema` bookkeeping table to
/// `version`, forward-only: a retry or an out-of-order re-run can never
/// move the recorded version backward.
pub(crate) async fn advance(manager: &SchemaManager, version: i32) -> Result<(), DbErr> {
    manager
        .get_connection()
        .execute_unprepared(&format!(
            "INSERT INTO sqlzibar_schema (id, version) VALUES (1, {version}) \
             ON CONFLICT (id) DO UPDATE SET version = EXCLUDED.version \
             WHERE sqlzibar_schema.version < EXCLUDED.version;"
        ))
        .await?;
    Ok(())
}
