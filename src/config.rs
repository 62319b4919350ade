//! Host-supplied configuration.
//!
//! A library never reads the process environment for itself — the host
//! loads its own environment and builds an `EngineConfig` to hand to
//! the engine.

use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Store-native schema name.
    pub schema: String,
    /// Identifier of the seeded root resource.
    pub root_resource_id: Uuid,
    /// Display name of the seeded root resource.
    pub root_resource_name: String,
    /// When `true`, the schema manager deploys `fn_is_resource_accessible`
    /// and [`crate::access::ResourceAccessResolver`] calls into it instead
    /// of composing the recursive CTE itself.
    pub initialize_functions: bool,
    /// Whether [`crate::seed::CoreSeeder`] should run at all.
    pub seed_core_data: bool,
    /// Host-owned predicate gating dashboard access. The dashboard itself
    /// is out of scope for this crate; this field only carries the knob
    /// so hosts can plumb it through their own config loading.
    pub dashboard_authorization_callback: Option<()>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema: "dbo".to_string(),
            root_resource_id: well_known::ROOT_RESOURCE_ID,
            root_resource_name: "Root".to_string(),
            initialize_functions: false,
            seed_core_data: true,
            dashboard_authorization_callback: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_well_known_root() {
        let config = EngineConfig::default();
        assert_eq!(config.root_resource_id, well_known::ROOT_RESOURCE_ID);
        assert_eq!(config.root_resource_name, "Root");
        assert!(!config.initialize_functions);
        assert!(config.seed_core_data);
    }

}

pub mod well_known {
    use uuid::{uuid, Uuid};

    /// Fixed id of the root resource, stable across deployments so the
    /// seeder is idempotent without a lookup.
    pub const ROOT_RESOURCE_ID: Uuid = uuid!("00000000-0000-0000-0000-000000000001");

    pub const SYSTEM_ADMIN_PRINCIPAL_ID: Uuid = uuid!("00000000-0000-0000-0000-000000000002");
    pub const SYSTEM_ADMIN_ROLE_KEY: &str = "system_admin";
}
