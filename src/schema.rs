//! Runtime access to the schema version the migration sequence last
//! recorded, for hosts that want to assert the store is at the version
//! they expect before running.

use sea_orm::{ConnectionTrait, Statement};

use crate::error::{EngineError, EngineResult};

pub struct SchemaManager;

impl SchemaManager {
    /// Reads the version recorded in the single-row `sqlzibar_schema`
    /// table. Errors if the table is empty, which only happens if the
    /// migration sequence was never run.
    pub async fn current_version<C: ConnectionTrait>(db: &C) -> EngineResult<i32> {
        let statement = Statement::from_string(
            db.get_database_backend(),
            "SELECT version FROM sqlzibar_schema WHERE id = 1".to_owned(),
        );
        let row = db.query_one(statement).await?;
        let row = row.ok_or(EngineError::SchemaNotInitialized)?;
        Ok(row.try_get::<i32>("", "version")?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    use super::*;

    #[tokio::test]
    async fn current_version_reads_the_recorded_row() {
        let mut row = BTreeMap::new();
        row.insert("version", Value::Int(Some(15)));

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![row]])
            .into_connection();

        let version = SchemaManager::current_version(&db).await.expect("row is present");

        assert_eq!(version, 15);
    }

    #[tokio::test]
    async fn current_version_errors_when_the_table_is_empty() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();

        let err = SchemaManager::current_version(&db).await.unwrap_err();

        assert!(matches!(err, EngineError::SchemaNotInitialized));
    }
}
