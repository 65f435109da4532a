use thiserror::Error;

/// Error taxonomy for the indexing pipeline (spec §7).
#[derive(Error, Debug)]
pub enum CoreError {
    /// Natural-key lookup of a nonexistent entity, surfaced explicitly for
    /// management operations (Acknowledge/Close/UpdateRule); most store
    /// lookups return `Option` instead of this variant.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("transport error: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
