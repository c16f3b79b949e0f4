use thiserror::Error;

/// Errors that can occur when talking to catalog, user or ledger storage.
///
/// Missing rows are not errors: lookups return `Option` and registrations
/// report [`crate::Registration::AlreadyExisted`].
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A JSON column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The storage backend is unavailable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
