//! Idempotent core-data seeding, run once the schema is at its latest
//! migration. Every insert here is a "check if it exists, insert if
//! not" upsert keyed by natural id or key, kept as a standalone service
//! rather than folded into a migration script, since re-seeding must
//! stay safe to call on every boot.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::{uuid, Uuid};

use crate::config::{well_known as engine_well_known, EngineConfig};
use crate::entities::{
    permission, prelude::*, principal, principal_type, resource, resource_type, role, role_permission,
};
use crate::error::{ensure_not_cancelled, EngineResult};

const PRINCIPAL_TYPE_USER_ID: Uuid = uuid!("00000000-0000-0000-0000-0000000000a1");
const PRINCIPAL_TYPE_SERVICE_ACCOUNT_ID: Uuid = uuid!("00000000-0000-0000-0000-0000000000a2");
const PRINCIPAL_TYPE_GROUP_ID: Uuid = uuid!("00000000-0000-0000-0000-0000000000a3");
const PRINCIPAL_TYPE_AGENT_ID: Uuid = uuid!("00000000-0000-0000-0000-0000000000a4");

const RESOURCE_TYPE_ROOT_ID: Uuid = uuid!("00000000-0000-0000-0000-0000000000b1");

const ROLE_SYSTEM_ADMIN_ID: Uuid = uuid!("00000000-0000-0000-0000-0000000000c1");

/// The one bootstrap permission the engine itself knows about; every other
/// permission key is registered by the host's own migrations.
const PERMISSION_ENGINE_MANAGE_ID: Uuid = uuid!("00000000-0000-0000-0000-0000000000d1");
const PERMISSION_ENGINE_MANAGE_KEY: &str = "engine.manage";

const SYSTEM_ADMIN_GRANT_ID: Uuid = uuid!("00000000-0000-0000-0000-0000000000e1");

/// Seeds the fixed set of rows every deployment needs before it can grant
/// its first permission: principal types, the root resource type and
/// resource, the system-admin role and its bootstrap permission, the
/// system-admin principal, and a grant of that role at the root.
#[derive(Clone, Debug)]
pub struct CoreSeeder {
    config: EngineConfig,
}

impl CoreSeeder {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Runs every upsert in a fixed order respecting foreign keys. Safe to
    /// call concurrently from multiple processes and safe to call on every
    /// boot.
    #[instrument(skip(self, db, cancel))]
    pub async fn run<C: ConnectionTrait>(&self, db: &C, cancel: &CancellationToken) -> EngineResult<()> {
        if !self.config.seed_core_data {
            debug!("core seeding disabled by configuration");
            return Ok(());
        }
        ensure_not_cancelled(cancel)?;

        self.seed_principal_type(db, PRINCIPAL_TYPE_USER_ID, principal_type::well_known::USER)
            .await?;
        self.seed_principal_type(
            db,
            PRINCIPAL_TYPE_SERVICE_ACCOUNT_ID,
            principal_type::well_known::SERVICE_ACCOUNT,
        )
        .await?;
        self.seed_principal_type(db, PRINCIPAL_TYPE_GROUP_ID, principal_type::well_known::GROUP)
            .await?;
        self.seed_principal_type(db, PRINCIPAL_TYPE_AGENT_ID, principal_type::well_known::AGENT)
            .await?;

        ensure_not_cancelled(cancel)?;
        self.seed_resource_type(db, RESOURCE_TYPE_ROOT_ID, resource_type::ROOT).await?;
        self.seed_root_resource(db).await?;

        ensure_not_cancelled(cancel)?;
        self.seed_role(db, ROLE_SYSTEM_ADMIN_ID, engine_well_known::SYSTEM_ADMIN_ROLE_KEY, "System Administrator", true)
            .await?;
        self.seed_permission(db, PERMISSION_ENGINE_MANAGE_ID, PERMISSION_ENGINE_MANAGE_KEY, "Manage the authorization engine", None)
            .await?;
        self.seed_role_permission(db, ROLE_SYSTEM_ADMIN_ID, PERMISSION_ENGINE_MANAGE_ID).await?;

        ensure_not_cancelled(cancel)?;
        self.seed_system_admin_principal(db).await?;
        self.seed_system_admin_grant(db).await?;

        Ok(())
    }

    async fn seed_principal_type<C: ConnectionTrait>(&self, db: &C, id: Uuid, name: &str) -> EngineResult<()> {
        if PrincipalType::find_by_id(id).one(db).await?.is_some() {
            return Ok(());
        }
        principal_type::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    async fn seed_resource_type<C: ConnectionTrait>(&self, db: &C, id: Uuid, name: &str) -> EngineResult<()> {
        if ResourceType::find_by_id(id).one(db).await?.is_some() {
            return Ok(());
        }
        resource_type::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    async fn seed_root_resource<C: ConnectionTrait>(&self, db: &C) -> EngineResult<()> {
        if Resource::find_by_id(self.config.root_resource_id).one(db).await?.is_some() {
            return Ok(());
        }
        let now = Utc::now().into();
        resource::ActiveModel {
            id: Set(self.config.root_resource_id),
            parent_id: Set(None),
            name: Set(self.config.root_resource_name.clone()),
            resource_type_id: Set(RESOURCE_TYPE_ROOT_ID),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    async fn seed_role<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        key: &str,
        name: &str,
        is_virtual: bool,
    ) -> EngineResult<()> {
        if Role::find()
            .filter(role::Column::Key.eq(key))
            .one(db)
            .await?
            .is_some()
        {
            return Ok(());
        }
        let now = Utc::now().into();
        role::ActiveModel {
            id: Set(id),
            key: Set(key.to_string()),
            name: Set(name.to_string()),
            is_virtual: Set(is_virtual),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    async fn seed_permission<C: ConnectionTrait>(
        &self,
        db: &C,
        id: Uuid,
        key: &str,
        name: &str,
        resource_type_id: Option<Uuid>,
    ) -> EngineResult<()> {
        if Permission::find()
            .filter(permission::Column::Key.eq(key))
            .one(db)
            .await?
            .is_some()
        {
            return Ok(());
        }
        let now = Utc::now().into();
        permission::ActiveModel {
            id: Set(id),
            key: Set(key.to_string()),
            name: Set(name.to_string()),
            resource_type_id: Set(resource_type_id),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    async fn seed_role_permission<C: ConnectionTrait>(&self, db: &C, role_id: Uuid, permission_id: Uuid) -> EngineResult<()> {
        let existing = RolePermission::find()
            .filter(role_permission::Column::RoleId.eq(role_id))
            .filter(role_permission::Column::PermissionId.eq(permission_id))
            .one(db)
            .await?;
        if existing.is_some() {
            return Ok(());
        }
        role_permission::ActiveModel {
            role_id: Set(role_id),
            permission_id: Set(permission_id),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    async fn seed_system_admin_principal<C: ConnectionTrait>(&self, db: &C) -> EngineResult<()> {
        if Principal::find_by_id(engine_well_known::SYSTEM_ADMIN_PRINCIPAL_ID)
            .one(db)
            .await?
            .is_some()
        {
            return Ok(());
        }
        let now = Utc::now().into();
        principal::ActiveModel {
            id: Set(engine_well_known::SYSTEM_ADMIN_PRINCIPAL_ID),
            principal_type_id: Set(PRINCIPAL_TYPE_SERVICE_ACCOUNT_ID),
            display_name: Set("System Administrator".to_string()),
            organization_id: Set(None),
            external_ref: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        Ok(())
    }

    async fn seed_system_admin_grant<C: ConnectionTrait>(&self, db: &C) -> EngineResult<()> {
        let existing = Grant::find()
            .filter(crate::entities::grant::Column::PrincipalId.eq(engine_well_known::SYSTEM_ADMIN_PRINCIPAL_ID))
            .filter(crate::entities::grant::Column::ResourceId.eq(self.config.root_resource_id))
            .filter(crate::entities::grant::Column::RoleId.eq(ROLE_SYSTEM_ADMIN_ID))
            .one(db)
            .await?;
        if existing.is_some() {
            return Ok(());
        }
        crate::entities::grant::ActiveModel {
            id: Set(SYSTEM_ADMIN_GRANT_ID),
            principal_id: Set(engine_well_known::SYSTEM_ADMIN_PRINCIPAL_ID),
            resource_id: Set(self.config.root_resource_id),
            role_id: Set(ROLE_SYSTEM_ADMIN_ID),
            effective_from: Set(None),
            effective_to: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};

    use super::*;

    #[tokio::test]
    async fn run_is_a_no_op_when_seeding_is_disabled() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let mut config = EngineConfig::default();
        config.seed_core_data = false;

        CoreSeeder::new(config)
            .run(&db, &CancellationToken::new())
            .await
            .expect("disabled seeding never touches the store");
    }

    #[tokio::test]
    async fn run_fails_fast_when_already_cancelled() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = CoreSeeder::new(EngineConfig::default())
            .run(&db, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, crate::error::EngineError::Cancelled));
    }
}
