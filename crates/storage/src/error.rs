use thiserror::Error;

use crate::ingest::ParseError;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Not found")]
    NotFound,

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid results file: {0}")]
    InvalidFile(#[from] ParseError),

    #[error("{0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            StorageError::Database(sqlx::Error::Database(e))
                if e.code().as_deref() == Some("23505")
        )
    }

    /// Maps a unique violation on `events.slug` to a constraint error, leaves anything else as is.
    pub fn slug_conflict(self) -> Self {
        if self.is_unique_violation() {
            StorageError::ConstraintViolation("Slug already exists".to_string())
        } else {
            self
        }
    }
}
