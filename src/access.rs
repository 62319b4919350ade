//! The resource-access resolver — the heart of the engine.
//!
//! Given a resolved principal set, a permission key, and optionally a
//! target resource, computes the set of resources at which that
//! permission holds, cascading every anchor grant down through the
//! resource hierarchy.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Condition, Expr};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Statement};
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::entities::{grant, permission, prelude::*, resource, role_permission};
use crate::error::{ensure_not_cancelled, EngineError, EngineResult};

/// The anchor set `A` plus everything needed to explain it: which roles
/// carried the permission, and which grants were the anchors. Kept
/// separate from the plain `HashSet<Uuid>` result so [`crate::auth`] can
/// build a trace from the same computation instead of a second query path.
#[derive(Debug, Clone)]
pub struct AnchorSet {
    pub permission: permission::Model,
    pub carrying_role_ids: Vec<Uuid>,
    pub anchor_grants: Vec<grant::Model>,
}

impl AnchorSet {
    #[must_use]
    pub fn anchor_resource_ids(&self) -> HashSet<Uuid> {
        self.anchor_grants.iter().map(|g| g.resource_id).collect()
    }
}

/// The query-composable form of the downward closure: either a
/// materialized id set or a reference to the store-side function, per
/// `EngineConfig::initialize_functions`.
#[derive(Debug, Clone)]
pub enum AccessibleResources {
    Ids(HashSet<Uuid>),
    StoreFunction {
        permission_id: Uuid,
        principal_ids: Vec<Uuid>,
    },
}

impl AccessibleResources {
    /// Builds a `Condition` restricting `column` to the accessible set,
    /// suitable for joining into any business query keyed by `ResourceId`.
    #[must_use]
    pub fn condition<C: ColumnTrait>(&self, column: C) -> Condition {
        match self {
            Self::Ids(ids) => {
                Condition::all().add(column.is_in(ids.iter().copied()))
            }
            Self::StoreFunction {
                permission_id,
                principal_ids,
            } => {
                let principal_list = principal_ids
                    .iter()
                    .map(Uuid::to_string)
                    .collect::<Vec<_>>()
                    .join(",");
                Condition::all().add(
                    Expr::cust_with_exprs(
                        "fn_is_resource_accessible(?, string_to_array(?, ',')::uuid[], ?)",
                        [
                            Expr::col(column).into(),
                            Expr::val(principal_list).into(),
                            Expr::val(*permission_id).into(),
                        ],
                    )
                    .eq(true),
                )
            }
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResourceAccessResolver {
    config: EngineConfig,
}

impl ResourceAccessResolver {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// The role set carrying `permission_key` and the active grants held
    /// by `principal_ids` in that role set. Shared by the decision path
    /// and the trace path so they never diverge.
    #[instrument(skip(self, db, principal_ids, cancel))]
    pub async fn anchor_set<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_ids: &[Uuid],
        permission_key: &str,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> EngineResult<AnchorSet> {
        ensure_not_cancelled(cancel)?;

        let permission = Permission::find()
            .filter(permission::Column::Key.eq(permission_key))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::UnknownPermission {
                key: permission_key.to_string(),
            })?;

        let carrying_role_ids: Vec<Uuid> = RolePermission::find()
            .filter(role_permission::Column::PermissionId.eq(permission.id))
            .select_only()
            .column(role_permission::Column::RoleId)
            .into_tuple::<Uuid>()
            .all(db)
            .await?;

        if principal_ids.is_empty() || carrying_role_ids.is_empty() {
            return Ok(AnchorSet {
                permission,
                carrying_role_ids,
                anchor_grants: Vec::new(),
            });
        }

        let anchor_grants = Grant::find()
            .filter(grant::Column::PrincipalId.is_in(principal_ids.iter().copied()))
            .filter(grant::Column::RoleId.is_in(carrying_role_ids.iter().copied()))
            .filter(active_grant_condition(at))
            .all(db)
            .await?;

        Ok(AnchorSet {
            permission,
            carrying_role_ids,
            anchor_grants,
        })
    }

    /// The downward closure of an anchor set, optionally refined to a
    /// single target resource and optionally restricted to the
    /// permission's resource type.
    #[instrument(skip(self, db, anchors, cancel))]
    pub async fn resolve_accessible_resources<C: ConnectionTrait>(
        &self,
        db: &C,
        anchors: &AnchorSet,
        target: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> EngineResult<HashSet<Uuid>> {
        ensure_not_cancelled(cancel)?;

        let anchor_ids = anchors.anchor_resource_ids();
        if anchor_ids.is_empty() {
            return Ok(HashSet::new());
        }

        let mut descendants = self.downward_closure(db, &anchor_ids).await?;

        if let Some(resource_type_id) = anchors.permission.resource_type_id {
            descendants = self.filter_by_resource_type(db, descendants, resource_type_id).await?;
        }

        if let Some(target) = target {
            return Ok(if descendants.contains(&target) {
                HashSet::from([target])
            } else {
                HashSet::new()
            });
        }

        Ok(descendants)
    }

    /// Full decision: anchor + closure + refinement in one call.
    pub async fn resolve<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_ids: &[Uuid],
        permission_key: &str,
        target: Option<Uuid>,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> EngineResult<HashSet<Uuid>> {
        let anchors = self
            .anchor_set(db, principal_ids, permission_key, at, cancel)
            .await?;
        self.resolve_accessible_resources(db, &anchors, target, cancel).await
    }

    /// The query-composable form used by the specification executor: a
    /// materialized id set, or a reference to the store-side function.
    pub async fn accessible_resources_query<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_ids: &[Uuid],
        permission_key: &str,
        at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> EngineResult<AccessibleResources> {
        let anchors = self
            .anchor_set(db, principal_ids, permission_key, at, cancel)
            .await?;

        if self.config.initialize_functions {
            return Ok(AccessibleResources::StoreFunction {
                permission_id: anchors.permission.id,
                principal_ids: principal_ids.to_vec(),
            });
        }

        let ids = self
            .resolve_accessible_resources(db, &anchors, None, cancel)
            .await?;
        Ok(AccessibleResources::Ids(ids))
    }

    /// `A ∪ { every resource whose ancestor chain intersects A }`, computed
    /// as a single recursive query. Sea-query has no recursive-CTE
    /// builder, so this is issued as a raw statement.
    async fn downward_closure<C: ConnectionTrait>(
        &self,
        db: &C,
        anchor_ids: &HashSet<Uuid>,
    ) -> EngineResult<HashSet<Uuid>> {
        let table = format!("{}.resource", self.config.schema);
        let sql = format!(
            "WITH RECURSIVE descendants AS ( \
                SELECT id, parent_id FROM {table} WHERE id = ANY($1) \
                UNION ALL \
                SELECT r.id, r.parent_id FROM {table} r \
                INNER JOIN descendants d ON r.parent_id = d.id \
            ) SELECT id FROM descendants"
        );

        let backend = db.get_database_backend();
        let ids: Vec<Uuid> = anchor_ids.iter().copied().collect();
        let statement = Statement::from_sql_and_values(backend, &sql, [ids.into()]);

        let rows = db.query_all(statement).await?;
        let mut result = HashSet::with_capacity(rows.len());
        for row in rows {
            result.insert(row.try_get::<Uuid>("", "id")?);
        }
        Ok(result)
    }

    async fn filter_by_resource_type<C: ConnectionTrait>(
        &self,
        db: &C,
        ids: HashSet<Uuid>,
        resource_type_id: Uuid,
    ) -> EngineResult<HashSet<Uuid>> {
        if ids.is_empty() {
            return Ok(ids);
        }
        let matching: Vec<Uuid> = Resource::find()
            .filter(resource::Column::Id.is_in(ids))
            .filter(resource::Column::ResourceTypeId.eq(resource_type_id))
            .select_only()
            .column(resource::Column::Id)
            .into_tuple::<Uuid>()
            .all(db)
            .await?;
        Ok(matching.into_iter().collect())
    }
}

/// A grant is active at `at` iff its window contains `at`.
#[must_use]
pub fn active_grant_condition(at: DateTime<Utc>) -> Condition {
    Condition::all()
        .add(
            Condition::any()
                .add(grant::Column::EffectiveFrom.is_null())
                .add(grant::Column::EffectiveFrom.lte(at)),
        )
        .add(
            Condition::any()
                .add(grant::Column::EffectiveTo.is_null())
                .add(grant::Column::EffectiveTo.gt(at)),
        )
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use sea_orm::sea_query::{PostgresQueryBuilder, QueryStatementWriter};
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    use super::*;

    fn uuid_row(column: &'static str, id: Uuid) -> BTreeMap<&'static str, Value> {
        let mut row = BTreeMap::new();
        row.insert(column, Value::from(id));
        row
    }

    #[test]
    fn active_grant_condition_bounds_both_edges() {
        let at = Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap();
        let sql = sea_orm::sea_query::Query::select()
            .cond_where(active_grant_condition(at))
            .to_string(PostgresQueryBuilder);

        assert!(sql.contains("effective_from"));
        assert!(sql.contains("effective_to"));
    }

    #[test]
    fn anchor_resource_ids_reflects_anchor_grants_only() {
        let resource_a = Uuid::new_v4();
        let resource_b = Uuid::new_v4();
        let now = Utc::now();
        let anchors = AnchorSet {
            permission: permission::Model {
                id: Uuid::new_v4(),
                key: "project.view".to_string(),
                name: "View project".to_string(),
                resource_type_id: None,
                created_at: now.into(),
                updated_at: now.into(),
            },
            carrying_role_ids: vec![Uuid::new_v4()],
            anchor_grants: vec![
                grant::Model {
                    id: Uuid::new_v4(),
                    principal_id: Uuid::new_v4(),
                    resource_id: resource_a,
                    role_id: Uuid::new_v4(),
                    effective_from: None,
                    effective_to: None,
                    created_at: now.into(),
                },
                grant::Model {
                    id: Uuid::new_v4(),
                    principal_id: Uuid::new_v4(),
                    resource_id: resource_b,
                    role_id: Uuid::new_v4(),
                    effective_from: None,
                    effective_to: None,
                    created_at: now.into(),
                },
            ],
        };

        let ids = anchors.anchor_resource_ids();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&resource_a));
        assert!(ids.contains(&resource_b));
    }

    #[tokio::test]
    async fn resolve_cascades_an_anchor_grant_down_to_its_descendants() {
        let permission_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        let principal_id = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();
        let now = Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![permission::Model {
                id: permission_id,
                key: "document.edit".to_string(),
                name: "Edit document".to_string(),
                resource_type_id: None,
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .append_query_results([vec![uuid_row("role_id", role_id)]])
            .append_query_results([vec![grant::Model {
                id: Uuid::new_v4(),
                principal_id,
                resource_id: parent,
                role_id,
                effective_from: None,
                effective_to: None,
                created_at: now.into(),
            }]])
            .append_query_results([vec![uuid_row("id", parent), uuid_row("id", child)]])
            .into_connection();

        let resolver = ResourceAccessResolver::new(EngineConfig::default());
        let resolved = resolver
            .resolve(&db, &[principal_id], "document.edit", None, now, &CancellationToken::new())
            .await
            .expect("resolve succeeds");

        assert_eq!(resolved, HashSet::from([parent, child]));
    }

    #[tokio::test]
    async fn resolve_denies_by_default_when_no_role_carries_the_permission() {
        let permission_id = Uuid::new_v4();
        let principal_id = Uuid::new_v4();
        let now = Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![permission::Model {
                id: permission_id,
                key: "document.edit".to_string(),
                name: "Edit document".to_string(),
                resource_type_id: None,
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();

        let resolver = ResourceAccessResolver::new(EngineConfig::default());
        let resolved = resolver
            .resolve(&db, &[principal_id], "document.edit", None, now, &CancellationToken::new())
            .await
            .expect("resolve succeeds");

        assert!(resolved.is_empty());
    }
}
