//! The specification executor: folds a permission check into an
//! arbitrary business query, with filtering, search, ordering, and
//! cursor pagination on top.
//!
//! See DESIGN.md for the cursor format's grounding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, EntityTrait, Order, QueryFilter, QueryOrder, QuerySelect};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::access::ResourceAccessResolver;
use crate::config::EngineConfig;
use crate::error::{ensure_not_cancelled, EngineError, EngineResult};
use crate::principal::PrincipalResolver;

const CURSOR_SEPARATOR: char = '\u{1}';

/// The typed value a specification sorts on. Kept as an enum rather than a
/// bare string so the cursor can round-trip through comparisons the store
/// understands natively (numeric, temporal, or lexical).
#[derive(Clone, Debug, PartialEq)]
pub enum SortValue {
    Text(String),
    Int(i64),
    Timestamp(DateTime<Utc>),
}

impl SortValue {
    fn encode(&self) -> String {
        match self {
            Self::Text(s) => format!("t:{s}"),
            Self::Int(i) => format!("i:{i}"),
            Self::Timestamp(dt) => format!("d:{}", dt.to_rfc3339()),
        }
    }

    fn decode(raw: &str) -> EngineResult<Self> {
        let (tag, rest) = raw.split_once(':').ok_or(EngineError::InvalidCursor)?;
        match tag {
            "t" => Ok(Self::Text(rest.to_string())),
            "i" => rest.parse().map(Self::Int).map_err(|_| EngineError::InvalidCursor),
            "d" => DateTime::parse_from_rfc3339(rest)
                .map(|dt| Self::Timestamp(dt.with_timezone(&Utc)))
                .map_err(|_| EngineError::InvalidCursor),
            _ => Err(EngineError::InvalidCursor),
        }
    }

    fn sea_value(&self) -> sea_orm::Value {
        match self {
            Self::Text(s) => s.clone().into(),
            Self::Int(i) => (*i).into(),
            Self::Timestamp(dt) => (*dt).into(),
        }
    }
}

/// Opaque keyset cursor: `(last sort value, last primary id)`, base64url
/// encoded. Malformed input is always `INVALID_CURSOR`, never ignored.
#[derive(Clone, Debug, PartialEq)]
pub struct Cursor {
    pub sort_value: SortValue,
    pub last_id: Uuid,
}

impl Cursor {
    #[must_use]
    pub fn encode(&self) -> String {
        let raw = format!("{}{CURSOR_SEPARATOR}{}", self.sort_value.encode(), self.last_id);
        URL_SAFE_NO_PAD.encode(raw)
    }

    pub fn decode(encoded: &str) -> EngineResult<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded)
            .map_err(|_| EngineError::InvalidCursor)?;
        let raw = String::from_utf8(raw).map_err(|_| EngineError::InvalidCursor)?;
        let (sort_raw, id_raw) = raw.rsplit_once(CURSOR_SEPARATOR).ok_or(EngineError::InvalidCursor)?;
        let sort_value = SortValue::decode(sort_raw)?;
        let last_id = id_raw.parse().map_err(|_| EngineError::InvalidCursor)?;
        Ok(Self { sort_value, last_id })
    }
}

/// Case-insensitive substring search over one or more text columns,
/// OR-combined when a non-empty term is supplied.
pub struct SearchSpec<E: EntityTrait> {
    pub term: String,
    pub columns: Vec<E::Column>,
}

/// A declarative, permission-gated view of an entity type: the bundle
/// business code hands to [`SpecificationExecutor::run`]. `sort_value_of`
/// and `id_of` let the executor build and compare cursors generically,
/// without assuming how `E::Model` exposes its fields.
pub struct Specification<E: EntityTrait> {
    pub permission_key: String,
    pub resource_id_column: E::Column,
    pub filter: Condition,
    pub search: Option<SearchSpec<E>>,
    pub sort_column: E::Column,
    pub sort_order: Order,
    pub sort_value_of: fn(&E::Model) -> SortValue,
    pub id_column: E::Column,
    pub id_of: fn(&E::Model) -> Uuid,
    pub page_size: u64,
    pub cursor: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SpecificationExecutor {
    access: ResourceAccessResolver,
    principals: PrincipalResolver,
}

impl SpecificationExecutor {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            access: ResourceAccessResolver::new(config),
            principals: PrincipalResolver::new(),
        }
    }

    /// Runs `spec` for `caller_principal_id`: resolves the caller's
    /// principal set, restricts the base query to accessible resources,
    /// applies search and ordering, and returns one keyset page.
    pub async fn run<C, E>(
        &self,
        db: &C,
        caller_principal_id: Uuid,
        spec: &Specification<E>,
        cancel: &CancellationToken,
    ) -> EngineResult<Page<E::Model>>
    where
        C: ConnectionTrait,
        E: EntityTrait,
    {
        ensure_not_cancelled(cancel)?;

        let principal_ids = self.principals.resolve_principal_ids(db, caller_principal_id).await?;
        if principal_ids.is_empty() {
            return Err(EngineError::UnknownPrincipal {
                id: caller_principal_id,
            });
        }

        let accessible = self
            .access
            .accessible_resources_query(db, &principal_ids, &spec.permission_key, Utc::now(), cancel)
            .await?;

        let mut query = E::find()
            .filter(spec.filter.clone())
            .filter(accessible.condition(spec.resource_id_column));

        if let Some(search) = &spec.search {
            if !search.term.is_empty() {
                let pattern = format!("%{}%", search.term.to_lowercase());
                let mut term_condition = Condition::any();
                for &column in &search.columns {
                    term_condition = term_condition
                        .add(Expr::expr(Func::lower(Expr::col(column).into())).like(pattern.clone()));
                }
                query = query.filter(term_condition);
            }
        }

        if let Some(cursor_str) = &spec.cursor {
            let cursor = Cursor::decode(cursor_str)?;
            query = query.filter(self.cursor_condition(spec, &cursor));
        }

        query = query
            .order_by(spec.sort_column, spec.sort_order.clone())
            .order_by(spec.id_column, spec.sort_order.clone());

        let mut rows = query.limit(spec.page_size + 1).all(db).await?;

        let next_cursor = if rows.len() as u64 > spec.page_size {
            rows.truncate(spec.page_size as usize);
            rows.last().map(|last| {
                Cursor {
                    sort_value: (spec.sort_value_of)(last),
                    last_id: (spec.id_of)(last),
                }
                .encode()
            })
        } else {
            None
        };

        Ok(Page {
            items: rows,
            next_cursor,
        })
    }

    fn cursor_condition<E: EntityTrait>(&self, spec: &Specification<E>, cursor: &Cursor) -> Condition {
        let value = cursor.sort_value.sea_value();
        let (sort_cmp, id_cmp) = match spec.sort_order {
            Order::Asc => (true, true),
            Order::Desc | Order::Field(_) => (false, false),
        };

        let tie_break = Condition::all()
            .add(spec.sort_column.eq(value.clone()))
            .add(if id_cmp {
                spec.id_column.gt(cursor.last_id)
            } else {
                spec.id_column.lt(cursor.last_id)
            });

        let strictly_past = if sort_cmp {
            spec.sort_column.gt(value)
        } else {
            spec.sort_column.lt(value)
        };

        Condition::any().add(strictly_past).add(tie_break)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};
    use uuid::uuid;

    use crate::entities::{grant, permission, principal, resource};

    use super::*;

    #[test]
    fn cursor_round_trips_through_encoding() {
        let cursor = Cursor {
            sort_value: SortValue::Text("acme corp".to_string()),
            last_id: uuid!("00000000-0000-0000-0000-000000000042"),
        };
        let encoded = cursor.encode();
        let decoded = Cursor::decode(&encoded).expect("valid cursor decodes");
        assert_eq!(decoded, cursor);
    }

    #[test]
    fn cursor_round_trips_timestamp_sort_values() {
        let at = Utc.with_ymd_and_hms(2026, 1, 15, 12, 30, 0).unwrap();
        let cursor = Cursor {
            sort_value: SortValue::Timestamp(at),
            last_id: uuid!("00000000-0000-0000-0000-000000000043"),
        };
        let decoded = Cursor::decode(&cursor.encode()).expect("valid cursor decodes");
        assert_eq!(decoded.sort_value, SortValue::Timestamp(at));
    }

    #[test]
    fn malformed_cursor_is_invalid_not_ignored() {
        let err = Cursor::decode("not-a-real-cursor").unwrap_err();
        assert!(matches!(err, EngineError::InvalidCursor));
    }

    #[test]
    fn garbage_inside_a_validly_encoded_cursor_is_invalid() {
        let encoded = URL_SAFE_NO_PAD.encode("x:bogus-tag\u{1}also-not-a-uuid");
        let err = Cursor::decode(&encoded).unwrap_err();
        assert!(matches!(err, EngineError::InvalidCursor));
    }

    fn uuid_row(column: &'static str, id: Uuid) -> BTreeMap<&'static str, Value> {
        let mut row = BTreeMap::new();
        row.insert(column, Value::from(id));
        row
    }

    fn resource_row(id: Uuid, name: &str) -> resource::Model {
        let now = Utc::now();
        resource::Model {
            id,
            parent_id: None,
            name: name.to_string(),
            resource_type_id: Uuid::new_v4(),
            is_active: true,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[tokio::test]
    async fn run_returns_a_next_cursor_when_more_rows_remain_than_the_page_size() {
        let caller_id = uuid!("00000000-0000-0000-0000-000000000050");
        let principal_type_id = Uuid::new_v4();
        let permission_id = Uuid::new_v4();
        let role_id = Uuid::new_v4();
        let anchor_resource = Uuid::new_v4();
        let now = Utc::now();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![principal::Model {
                id: caller_id,
                principal_type_id,
                display_name: "Ada Lovelace".to_string(),
                organization_id: None,
                external_ref: None,
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .append_query_results([Vec::<crate::entities::user_group_membership::Model>::new()])
            .append_query_results([vec![permission::Model {
                id: permission_id,
                key: "document.view".to_string(),
                name: "View document".to_string(),
                resource_type_id: None,
                created_at: now.into(),
                updated_at: now.into(),
            }]])
            .append_query_results([vec![uuid_row("role_id", role_id)]])
            .append_query_results([vec![grant::Model {
                id: Uuid::new_v4(),
                principal_id: caller_id,
                resource_id: anchor_resource,
                role_id,
                effective_from: None,
                effective_to: None,
                created_at: now.into(),
            }]])
            .append_query_results([vec![uuid_row("id", anchor_resource)]])
            .append_query_results([vec![
                resource_row(Uuid::new_v4(), "alpha"),
                resource_row(Uuid::new_v4(), "beta"),
            ]])
            .into_connection();

        let spec = Specification::<resource::Entity> {
            permission_key: "document.view".to_string(),
            resource_id_column: resource::Column::Id,
            filter: Condition::all(),
            search: None,
            sort_column: resource::Column::Name,
            sort_order: Order::Asc,
            sort_value_of: |m| SortValue::Text(m.name.clone()),
            id_column: resource::Column::Id,
            id_of: |m| m.id,
            page_size: 1,
            cursor: None,
        };

        let executor = SpecificationExecutor::new(EngineConfig::default());
        let page = executor
            .run(&db, caller_id, &spec, &CancellationToken::new())
            .await
            .expect("run succeeds");

        assert_eq!(page.items.len(), 1);
        assert!(page.next_cursor.is_some());
    }
}
