use thiserror::Error;

/// Business-path error taxonomy.
///
/// Validation and not-found surface to callers as client errors. An
/// unresolved conflict (the compensating read after a unique-name race
/// found nothing) is an internal failure. Storage errors stay opaque.
#[derive(Debug, Error)]
pub enum ProductError {
    #[error("{0}")]
    Validation(String),

    #[error("product not found with id: {0}")]
    NotFound(i64),

    #[error("concurrent create for name {0:?} could not be resolved")]
    ConflictUnresolved(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

impl ProductError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
