//! Principal resolution.
//!
//! Resolves a caller identifier into the full set of principals that stand
//! for it: itself, plus every group it currently belongs to. Single-level
//! only — nested groups are rejected at insertion, never resolved away.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::{prelude::*, principal, principal_type, user_group, user_group_membership};
use crate::error::{ensure_not_cancelled, EngineError, EngineResult};

#[derive(Clone, Copy, Debug, Default)]
pub struct PrincipalResolver;

impl PrincipalResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns `principal_id` followed by every group principal id that
    /// currently contains it. `Ok(vec![])` iff `principal_id` does not
    /// exist; a principal with no memberships resolves to `[principal_id]`.
    #[instrument(skip(self, db))]
    pub async fn resolve_principal_ids<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_id: Uuid,
    ) -> EngineResult<Vec<Uuid>> {
        if Principal::find_by_id(principal_id).one(db).await?.is_none() {
            debug!(%principal_id, "principal does not exist");
            return Ok(Vec::new());
        }

        let groups = self.get_groups_for_principal(db, principal_id).await?;

        let mut ids = Vec::with_capacity(1 + groups.len());
        ids.push(principal_id);
        ids.extend(groups.into_iter().map(|g| g.principal_id));
        Ok(ids)
    }

    /// Returns the `UserGroup` rows whose membership currently contains
    /// `principal_id`. Always empty for a principal that is itself a group,
    /// since groups are never inserted as members.
    pub async fn get_groups_for_principal<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_id: Uuid,
    ) -> EngineResult<Vec<user_group::Model>> {
        let memberships = UserGroupMembership::find()
            .filter(user_group_membership::Column::PrincipalId.eq(principal_id))
            .all(db)
            .await?;

        if memberships.is_empty() {
            return Ok(Vec::new());
        }

        let group_ids: Vec<Uuid> = memberships.into_iter().map(|m| m.user_group_id).collect();
        let groups = UserGroup::find()
            .filter(user_group::Column::Id.is_in(group_ids))
            .all(db)
            .await?;
        Ok(groups)
    }

    /// Adds `principal_id` to `group_id`. Fails with `INVALID_MEMBERSHIP`
    /// if `principal_id` names a principal of type `group` (single-level
    /// membership only). Idempotent: adding twice is a no-op.
    #[instrument(skip(self, db, cancel))]
    pub async fn add_to_group<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_id: Uuid,
        group_id: Uuid,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        ensure_not_cancelled(cancel)?;

        let principal = Principal::find_by_id(principal_id)
            .one(db)
            .await?
            .ok_or(EngineError::UnknownPrincipal { id: principal_id })?;

        let kind = PrincipalType::find_by_id(principal.principal_type_id)
            .one(db)
            .await?
            .ok_or(EngineError::UnknownPrincipal { id: principal_id })?;

        if kind.name == principal_type::well_known::GROUP {
            return Err(EngineError::InvalidMembership {
                principal_id,
                group_id,
            });
        }

        let existing = UserGroupMembership::find()
            .filter(user_group_membership::Column::PrincipalId.eq(principal_id))
            .filter(user_group_membership::Column::UserGroupId.eq(group_id))
            .one(db)
            .await?;

        if existing.is_some() {
            return Ok(());
        }

        ensure_not_cancelled(cancel)?;

        let membership = user_group_membership::ActiveModel {
            principal_id: Set(principal_id),
            user_group_id: Set(group_id),
            created_at: Set(Utc::now().into()),
        };
        membership.insert(db).await?;
        Ok(())
    }

    /// Removes `principal_id` from `group_id`. Idempotent: removing a
    /// membership that doesn't exist is not an error.
    #[instrument(skip(self, db, cancel))]
    pub async fn remove_from_group<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_id: Uuid,
        group_id: Uuid,
        cancel: &CancellationToken,
    ) -> EngineResult<()> {
        ensure_not_cancelled(cancel)?;

        UserGroupMembership::delete_many()
            .filter(user_group_membership::Column::PrincipalId.eq(principal_id))
            .filter(user_group_membership::Column::UserGroupId.eq(group_id))
            .exec(db)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{DatabaseBackend, MockDatabase};
    use uuid::uuid;

    use super::*;

    fn principal_row(id: Uuid, principal_type_id: Uuid) -> principal::Model {
        principal::Model {
            id,
            principal_type_id,
            display_name: "Ada Lovelace".to_string(),
            organization_id: None,
            external_ref: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn resolve_principal_ids_is_empty_for_unknown_principal() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<principal::Model>::new()])
            .into_connection();

        let resolved = PrincipalResolver::new()
            .resolve_principal_ids(&db, uuid!("00000000-0000-0000-0000-000000000099"))
            .await
            .expect("lookup succeeds");

        assert!(resolved.is_empty());
    }

    #[tokio::test]
    async fn add_to_group_rejects_a_group_principal() {
        let principal_id = uuid!("00000000-0000-0000-0000-000000000010");
        let group_type_id = uuid!("00000000-0000-0000-0000-000000000011");
        let target_group_id = uuid!("00000000-0000-0000-0000-000000000012");

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![principal_row(principal_id, group_type_id)]])
            .append_query_results([vec![principal_type::Model {
                id: group_type_id,
                name: principal_type::well_known::GROUP.to_string(),
            }]])
            .into_connection();

        let err = PrincipalResolver::new()
            .add_to_group(&db, principal_id, target_group_id, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::InvalidMembership { .. }));
    }

    #[tokio::test]
    async fn add_to_group_fails_fast_when_already_cancelled() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = PrincipalResolver::new()
            .add_to_group(
                &db,
                uuid!("00000000-0000-0000-0000-000000000020"),
                uuid!("00000000-0000-0000-0000-000000000021"),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Cancelled));
    }
}
