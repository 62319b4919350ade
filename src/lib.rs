//! Sqlzibar: a relational-store-backed authorization engine.
//!
//! Embedded as a library by a host application — no HTTP surface, no CLI.
//! The host supplies a database connection per call and an authenticated
//! caller principal id; everything else (principal resolution, cascading
//! grants, decision tracing, permission-gated queries) lives here.

pub mod access;
pub mod auth;
pub mod config;
pub mod entities;
pub mod error;
pub mod principal;
pub mod schema;
pub mod seed;
pub mod specification;

pub use access::{AccessibleResources, AnchorSet, ResourceAccessResolver};
pub use auth::{AuthService, Trace};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use principal::PrincipalResolver;
pub use schema::SchemaManager;
pub use seed::CoreSeeder;
pub use specification::{Cursor, Page, Specification, SpecificationExecutor};
