//! The public decision API: point checks, capability checks, and full
//! explanatory traces, all built on the principal resolver and the
//! resource-access resolver.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::instrument;
use uuid::Uuid;

use crate::access::{active_grant_condition, AnchorSet, ResourceAccessResolver};
use crate::config::EngineConfig;
use crate::entities::{grant, prelude::*, resource};
use crate::error::{ensure_not_cancelled, EngineError, EngineResult};
use crate::principal::PrincipalResolver;

#[derive(Clone, Debug, Serialize)]
pub struct ResourceRef {
    pub id: Uuid,
    pub name: String,
    pub resource_type: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PrincipalRef {
    pub id: Uuid,
    pub display_name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PermissionRef {
    pub key: String,
    pub name: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoleTrace {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub is_virtual: bool,
    pub contributed: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct GrantTrace {
    pub grant_id: Uuid,
    pub resource_id: Uuid,
    pub role: RoleTrace,
    pub principal: PrincipalRef,
    pub via_group: Option<PrincipalRef>,
    pub contributed_to_decision: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct PathNode {
    pub depth: u32,
    pub resource: ResourceRef,
    pub grants: Vec<GrantTrace>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PrincipalTrace {
    pub principal: PrincipalRef,
    pub via_group: Option<PrincipalRef>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Trace {
    pub target: ResourceRef,
    pub principal: PrincipalRef,
    pub permission: PermissionRef,
    pub access_granted: bool,
    /// Depth 0 is the target resource itself, increasing toward the root.
    pub ancestor_path: Vec<PathNode>,
    pub grants_used: Vec<GrantTrace>,
    pub roles_used: Vec<RoleTrace>,
    pub principals_checked: Vec<PrincipalTrace>,
    pub decision_summary: String,
    pub denial_reason: Option<String>,
    pub suggestion: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AuthService {
    config: EngineConfig,
    principals: PrincipalResolver,
    access: ResourceAccessResolver,
}

impl AuthService {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            access: ResourceAccessResolver::new(config.clone()),
            principals: PrincipalResolver::new(),
            config,
        }
    }

    /// Resolves principals, evaluates the downward closure against
    /// `resource_id`, and returns whether access is allowed. Fails with
    /// `UNKNOWN_PERMISSION`/`UNKNOWN_PRINCIPAL`; never fails on an unknown
    /// resource id.
    #[instrument(skip(self, db, cancel))]
    pub async fn check_access<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_id: Uuid,
        permission_key: &str,
        resource_id: Uuid,
        cancel: &CancellationToken,
    ) -> EngineResult<bool> {
        ensure_not_cancelled(cancel)?;
        let principal_ids = self.resolved_principals_or_error(db, principal_id).await?;
        let now = Utc::now();
        let resolved = self
            .access
            .resolve(db, &principal_ids, permission_key, Some(resource_id), now, cancel)
            .await?;
        Ok(!resolved.is_empty())
    }

    /// Resolves principals, then asks whether `permission_key` holds
    /// anywhere in the hierarchy — used to gate capability-level UI
    /// without a target resource.
    #[instrument(skip(self, db, cancel))]
    pub async fn has_capability<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_id: Uuid,
        permission_key: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<bool> {
        ensure_not_cancelled(cancel)?;
        let principal_ids = self.resolved_principals_or_error(db, principal_id).await?;
        let now = Utc::now();
        let resolved = self
            .access
            .resolve(db, &principal_ids, permission_key, None, now, cancel)
            .await?;
        Ok(!resolved.is_empty())
    }

    async fn resolved_principals_or_error<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_id: Uuid,
    ) -> EngineResult<Vec<Uuid>> {
        let principal_ids = self.principals.resolve_principal_ids(db, principal_id).await?;
        if principal_ids.is_empty() {
            return Err(EngineError::UnknownPrincipal { id: principal_id });
        }
        Ok(principal_ids)
    }

    /// Runs the same decision as [`Self::check_access`] but collects a full
    /// diagnostic trace. Never mutates state; safe to
    /// invoke for a nonexistent principal or resource — those produce a
    /// denied trace with an explanatory `denial_reason`, not an error.
    /// Still fails with `UNKNOWN_PERMISSION` for an unregistered key, since
    /// that is an administrative caller error, not a decision outcome.
    #[instrument(skip(self, db, cancel))]
    pub async fn trace_resource_access<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_id: Uuid,
        resource_id: Uuid,
        permission_key: &str,
        cancel: &CancellationToken,
    ) -> EngineResult<Trace> {
        ensure_not_cancelled(cancel)?;
        let now = Utc::now();

        let principal_model = Principal::find_by_id(principal_id).one(db).await?;
        let principal_ids = match &principal_model {
            Some(_) => self.principals.resolve_principal_ids(db, principal_id).await?,
            None => Vec::new(),
        };

        let principal_ref = PrincipalRef {
            id: principal_id,
            display_name: principal_model
                .as_ref()
                .map_or_else(|| "(unknown principal)".to_string(), |p| p.display_name.clone()),
        };

        let anchors = self
            .access
            .anchor_set(db, &principal_ids, permission_key, now, cancel)
            .await?;

        let target_resource = Resource::find_by_id(resource_id).one(db).await?;
        let ancestor_chain = match &target_resource {
            Some(resource) => self.ancestor_chain(db, resource).await?,
            None => Vec::new(),
        };

        let target_ref = match &target_resource {
            Some(resource) => self.resource_ref(db, resource).await?,
            None => ResourceRef {
                id: resource_id,
                name: "(unknown resource)".to_string(),
                resource_type: "(unknown)".to_string(),
            },
        };

        let permission_ref = PermissionRef {
            key: anchors.permission.key.clone(),
            name: anchors.permission.name.clone(),
        };

        let access_granted = if target_resource.is_some() {
            !self
                .access
                .resolve_accessible_resources(db, &anchors, Some(resource_id), cancel)
                .await?
                .is_empty()
        } else {
            false
        };

        let (ancestor_path, grants_used, roles_used) = self
            .build_path(db, &ancestor_chain, &principal_ids, &anchors, access_granted)
            .await?;

        let principals_checked = self.principal_traces(db, principal_id, &principal_ids).await?;

        let decision_summary = self.decision_summary(
            &principal_ref,
            &permission_ref,
            &target_ref,
            access_granted,
            target_resource.is_some(),
        );

        let (denial_reason, suggestion) = if access_granted {
            (None, None)
        } else if principal_model.is_none() {
            (
                Some("principal does not exist".to_string()),
                Some("grant access to a principal that has been created in the engine".to_string()),
            )
        } else if target_resource.is_none() {
            (
                Some("resource does not exist".to_string()),
                Some("verify the resource id or create the resource before checking access".to_string()),
            )
        } else {
            (
                Some(format!(
                    "no role with permission {:?} is granted to this principal chain anywhere at or above this resource",
                    permission_ref.key
                )),
                Some(format!(
                    "grant a role carrying {:?} to {} or one of its groups, at {} or an ancestor resource",
                    permission_ref.key, principal_ref.display_name, target_ref.name
                )),
            )
        };

        Ok(Trace {
            target: target_ref,
            principal: principal_ref,
            permission: permission_ref,
            access_granted,
            ancestor_path,
            grants_used,
            roles_used,
            principals_checked,
            decision_summary,
            denial_reason,
            suggestion,
        })
    }

    async fn ancestor_chain<C: ConnectionTrait>(
        &self,
        db: &C,
        from: &resource::Model,
    ) -> EngineResult<Vec<resource::Model>> {
        let mut chain = vec![from.clone()];
        let mut current = from.clone();
        while let Some(parent_id) = current.parent_id {
            let Some(parent) = Resource::find_by_id(parent_id).one(db).await? else {
                break;
            };
            chain.push(parent.clone());
            current = parent;
        }
        Ok(chain)
    }

    async fn resource_ref<C: ConnectionTrait>(
        &self,
        db: &C,
        resource: &resource::Model,
    ) -> EngineResult<ResourceRef> {
        let resource_type = ResourceType::find_by_id(resource.resource_type_id)
            .one(db)
            .await?
            .map_or_else(|| "(unknown)".to_string(), |t| t.name);
        Ok(ResourceRef {
            id: resource.id,
            name: resource.name.clone(),
            resource_type,
        })
    }

    async fn build_path<C: ConnectionTrait>(
        &self,
        db: &C,
        ancestor_chain: &[resource::Model],
        principal_ids: &[Uuid],
        anchors: &AnchorSet,
        access_granted: bool,
    ) -> EngineResult<(Vec<PathNode>, Vec<GrantTrace>, Vec<RoleTrace>)> {
        if ancestor_chain.is_empty() || principal_ids.is_empty() {
            return Ok((Vec::new(), Vec::new(), Vec::new()));
        }

        let chain_ids: Vec<Uuid> = ancestor_chain.iter().map(|r| r.id).collect();
        let anchor_grant_ids: HashSet<Uuid> = anchors.anchor_grants.iter().map(|g| g.id).collect();
        let carrying_role_ids: HashSet<Uuid> = anchors.carrying_role_ids.iter().copied().collect();

        let grants = Grant::find()
            .filter(grant::Column::ResourceId.is_in(chain_ids.clone()))
            .filter(grant::Column::PrincipalId.is_in(principal_ids.iter().copied()))
            .filter(active_grant_condition(Utc::now()))
            .all(db)
            .await?;

        let mut by_resource: HashMap<Uuid, Vec<grant::Model>> = HashMap::new();
        for g in grants {
            by_resource.entry(g.resource_id).or_default().push(g);
        }

        let self_principal = principal_ids.first().copied();
        let group_labels = self.group_labels(db, principal_ids).await?;

        let mut path = Vec::with_capacity(ancestor_chain.len());
        let mut grants_used = Vec::new();
        let mut role_cache: HashMap<Uuid, RoleTrace> = HashMap::new();

        for (depth, resource) in ancestor_chain.iter().enumerate() {
            let node_ref = self.resource_ref(db, resource).await?;
            let node_grants = by_resource.remove(&resource.id).unwrap_or_default();

            let mut traces = Vec::with_capacity(node_grants.len());
            for g in node_grants {
                let role = Role::find_by_id(g.role_id).one(db).await?;
                let (role_key, role_name, is_virtual) = role
                    .map(|r| (r.key, r.name, r.is_virtual))
                    .unwrap_or_else(|| ("(unknown)".to_string(), "(unknown)".to_string(), false));

                let contributed = access_granted
                    && anchor_grant_ids.contains(&g.id)
                    && carrying_role_ids.contains(&g.role_id);

                let role_trace = role_cache
                    .entry(g.role_id)
                    .or_insert_with(|| RoleTrace {
                        id: g.role_id,
                        key: role_key,
                        name: role_name,
                        is_virtual,
                        contributed: false,
                    });
                role_trace.contributed |= contributed;

                let principal = Principal::find_by_id(g.principal_id).one(db).await?;
                let principal_ref = PrincipalRef {
                    id: g.principal_id,
                    display_name: principal.map_or_else(|| "(unknown)".to_string(), |p| p.display_name),
                };
                let via_group = if Some(g.principal_id) == self_principal {
                    None
                } else {
                    group_labels.get(&g.principal_id).cloned()
                };

                let trace = GrantTrace {
                    grant_id: g.id,
                    resource_id: g.resource_id,
                    role: role_cache[&g.role_id].clone(),
                    principal: principal_ref,
                    via_group,
                    contributed_to_decision: contributed,
                };
                traces.push(trace.clone());
                grants_used.push(trace);
            }

            path.push(PathNode {
                depth: depth as u32,
                resource: node_ref,
                grants: traces,
            });
        }

        let roles_used: Vec<RoleTrace> = role_cache.into_values().collect();
        Ok((path, grants_used, roles_used))
    }

    async fn group_labels<C: ConnectionTrait>(
        &self,
        db: &C,
        principal_ids: &[Uuid],
    ) -> EngineResult<HashMap<Uuid, PrincipalRef>> {
        let mut labels = HashMap::new();
        for &group_principal_id in principal_ids.iter().skip(1) {
            if let Some(principal) = Principal::find_by_id(group_principal_id).one(db).await? {
                labels.insert(
                    group_principal_id,
                    PrincipalRef {
                        id: principal.id,
                        display_name: principal.display_name,
                    },
                );
            }
        }
        Ok(labels)
    }

    async fn principal_traces<C: ConnectionTrait>(
        &self,
        db: &C,
        _self_id: Uuid,
        principal_ids: &[Uuid],
    ) -> EngineResult<Vec<PrincipalTrace>> {
        let mut out = Vec::with_capacity(principal_ids.len());
        for (idx, &id) in principal_ids.iter().enumerate() {
            let Some(principal) = Principal::find_by_id(id).one(db).await? else {
                continue;
            };
            let principal_ref = PrincipalRef {
                id: principal.id,
                display_name: principal.display_name,
            };
            let via_group = if idx == 0 {
                None
            } else {
                Some(principal_ref.clone())
            };
            out.push(PrincipalTrace {
                principal: principal_ref,
                via_group,
            });
        }
        Ok(out)
    }

    fn decision_summary(
        &self,
        principal: &PrincipalRef,
        permission: &PermissionRef,
        target: &ResourceRef,
        access_granted: bool,
        target_exists: bool,
    ) -> String {
        if !target_exists {
            return format!(
                "{} was checked for {:?} on an unknown resource; access is denied.",
                principal.display_name, permission.key
            );
        }
        if access_granted {
            format!(
                "{} is granted {:?} on {} via a cascading grant at or above this resource.",
                principal.display_name, permission.key, target.name
            )
        } else {
            format!(
                "{} is not granted {:?} on {}.",
                principal.display_name, permission.key, target.name
            )
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use uuid::uuid;

    use crate::entities::{permission, principal};

    use super::*;

    fn uuid_row(column: &'static str, id: Uuid) -> BTreeMap<&'static str, Value> {
        let mut row = BTreeMap::new();
        row.insert(column, Value::from(id));
        row
    }

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

    fn service() -> AuthService {
        AuthService::new(EngineConfig::default())
    }

    fn principal() -> PrincipalRef {
        PrincipalRef {
            id: uuid!("00000000-0000-0000-0000-000000000001"),
            display_name: "Ada Lovelace".to_string(),
        }
    }

    fn permission() -> PermissionRef {
        PermissionRef {
            key: "project.view".to_string(),
            name: "View project".to_string(),
        }
    }

    fn resource() -> ResourceRef {
        ResourceRef {
            id: uuid!("00000000-0000-0000-0000-000000000002"),
            name: "Acme Corp".to_string(),
            resource_type: "organization".to_string(),
        }
    }

    #[test]
    fn decision_summary_states_the_permission_and_resource_when_granted() {
        let summary = service().decision_summary(&principal(), &permission(), &resource(), true, true);
        assert!(summary.contains("Ada Lovelace"));
        assert!(summary.contains("project.view"));
        assert!(summary.contains("Acme Corp"));
    }

    #[test]
    fn decision_summary_flags_an_unknown_target_resource() {
        let summary = service().decision_summary(&principal(), &permission(), &resource(), false, false);
        assert!(summary.contains("unknown resource"));
    }

    #[test]
    fn decision_summary_states_denial_on_a_known_resource() {
        let summary = service().decision_summary(&principal(), &permission(), &resource(), false, true);
        assert!(summary.contains("is not granted"));
    }

    #[tokio::test]
    async fn check_access_grants_through_a_cascading_grant_on_an_ancestor() {
        let principal_id = uuid!("00000000-0000-0000-0000-000000000030");
        let principal_type_id = uuid!("00000000-0000-0000-0000-000000000031");
        let permission_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        let parent = Uuid::new_v4();
        let child = Uuid::new_v4();
        let now = Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![principal_row(principal_id, principal_type_id)]])
            .append_query_results([Vec::<crate::entities::user_group_membership::Model>::new()])
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

        let granted = service()
            .check_access(&db, principal_id, "document.edit", child, &CancellationToken::new())
            .await
            .expect("check succeeds");

        assert!(granted);
    }

    #[tokio::test]
    async fn trace_resource_access_denies_an_unknown_principal_with_a_reason() {
        let principal_id = Uuid::new_v4();
        let resource_id = Uuid::new_v4();
        let permission_id = Uuid::new_v4();
        let now = Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<principal::Model>::new()])
            .append_query_results([vec![permission::Model {
                id: permission_id,
                key: "document.edit".to_string(),
                name: "Edit document".to_string(),
                resource_type_id: None,
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .append_query_results([Vec::<crate::entities::resource::Model>::new()])
            .into_connection();

        let trace = service()
            .trace_resource_access(&db, principal_id, resource_id, "document.edit", &CancellationToken::new())
            .await
            .expect("trace succeeds even for an unknown principal");

        assert!(!trace.access_granted);
        assert_eq!(trace.denial_reason.as_deref(), Some("principal does not exist"));
    }
}
