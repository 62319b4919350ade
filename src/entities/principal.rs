//! `SeaORM` Entity, the abstract identity every grant attaches to.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "principal")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub principal_type_id: Uuid,
    pub display_name: String,
    pub organization_id: Option<Uuid>,
    pub external_ref: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::principal_type::Entity",
        from = "Column::PrincipalTypeId",
        to = "super::principal_type::Column::Id"
    )]
    PrincipalType,
    #[sea_orm(has_many = "super::grant::Entity")]
    Grant,
    #[sea_orm(has_many = "super::user_group_membership::Entity")]
    Membership,
}

impl Related<super::principal_type::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PrincipalType.def()
    }
}

impl Related<super::grant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Grant.def()
    }
}

impl Related<super::user_group_membership::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Membership.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
