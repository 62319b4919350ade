//! Persistent data model for the authorization engine.

pub mod agent;
pub mod grant;
pub mod permission;
pub mod principal;
pub mod principal_type;
pub mod resource;
pub mod resource_type;
pub mod role;
pub mod role_permission;
pub mod service_account;
pub mod user;
pub mod user_group;
pub mod user_group_membership;

pub mod prelude {
    pub use super::agent::Entity as Agent;
    pub use super::grant::Entity as Grant;
    pub use super::permission::Entity as Permission;
    pub use super::principal::Entity as Principal;
    pub use super::principal_type::Entity as PrincipalType;
    pub use super::resource::Entity as Resource;
    pub use super::resource_type::Entity as ResourceType;
    pub use super::role::Entity as Role;
    pub use super::role_permission::Entity as RolePermission;
    pub use super::service_account::Entity as ServiceAccount;
    pub use super::user::Entity as User;
    pub use super::user_group::Entity as UserGroup;
    pub use super::user_group_membership::Entity as UserGroupMembership;
}
