pub use sea_orm_migration::prelude::*;

mod schema_version;

mod m20250801_000001_create_schema_version_table;
mod m20250801_000002_create_principal_type_table;
mod m20250801_000003_create_principal_table;
mod m20250801_000004_create_user_table;
mod m20250801_000005_create_agent_table;
mod m20250801_000006_create_service_account_table;
mod m20250801_000007_create_user_group_table;
mod m20250801_000008_create_user_group_membership_table;
mod m20250801_000009_create_resource_type_table;
mod m20250801_000010_create_resource_table;
mod m20250801_000011_create_role_table;
mod m20250801_000012_create_permission_table;
mod m20250801_000013_create_role_permission_table;
mod m20250801_000014_create_grant_table;
mod m20250801_000015_create_accessible_resources_function;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250801_000001_create_schema_version_table::Migration),
            Box::new(m20250801_000002_create_principal_type_table::Migration),
            Box::new(m20250801_000003_create_principal_table::Migration),
            Box::new(m20250801_000004_create_user_table::Migration),
            Box::new(m20250801_000005_create_agent_table::Migration),
            Box::new(m20250801_000006_create_service_account_table::Migration),
            Box::new(m20250801_000007_create_user_group_table::Migration),
            Box::new(m20250801_000008_create_user_group_membership_table::Migration),
            Box::new(m20250801_000009_create_resource_type_table::Migration),
            Box::new(m20250801_000010_create_resource_table::Migration),
            Box::new(m20250801_000011_create_role_table::Migration),
            Box::new(m20250801_000012_create_permission_table::Migration),
            Box::new(m20250801_000013_create_role_permission_table::Migration),
            Box::new(m20250801_000014_create_grant_table::Migration),
            Box::new(m20250801_000015_create_accessible_resources_function::Migration),
        ]
    }
}
