use std::time::Duration;

use uuid::Uuid;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("Store operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Ticket not found: {0}")]
    NotFound(Uuid),

    #[error("Corrupt ticket row {id}: {reason}")]
    Corrupt { id: Uuid, reason: String },
}
