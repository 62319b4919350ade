//! Error kinds surfaced to the host.
//!
//! Nothing here is retried internally; hosts map these to transport errors.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("permission {key:?} is not registered")]
    UnknownPermission { key: String },

    #[error("role {key:?} is not registered")]
    UnknownRole { key: String },

    #[error("principal {id} does not exist")]
    UnknownPrincipal { id: Uuid },

    #[error("principal {principal_id} is of type group and cannot join group {group_id}")]
    InvalidMembership {
        principal_id: Uuid,
        group_id: Uuid,
    },

    #[error("cursor could not be decoded")]
    InvalidCursor,

    #[error("schema version table has no row; migrations have not run")]
    SchemaNotInitialized,

    #[error("operation was cancelled before it completed")]
    Cancelled,

    #[error("the store is temporarily unavailable: {0}")]
    StoreUnavailable(#[source] sea_orm::DbErr),
}

impl From<sea_orm::DbErr> for EngineError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::StoreUnavailable(err)
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Checked at the start of every operation and again right before a write
/// commits: cancellable up to, but not past, the commit.
pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> EngineResult<()> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled);
    }
    Ok(())
}
