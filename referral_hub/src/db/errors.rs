//! Storage error types.
//!
//! Raw driver errors are translated here so callers above the data-access
//! layer never see SQL state codes.

use crate::errors::{DomainError, ErrorKind};
use std::time::Duration;
use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("A record with this information already exists")]
    Conflict { constraint: String },

    /// The addressed row does not exist
    #[error("Record not found")]
    NotFound,

    /// A foreign key constraint rejected the write
    #[error("Referenced record does not exist")]
    ForeignKey { constraint: String },

    /// A stored value could not be mapped to a domain type
    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    /// Storage is unreachable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Operation exceeded its time budget
    #[error("Storage operation timed out after {0:?}")]
    Timeout(Duration),

    /// Any other database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl StoreError {
    /// Whether this error was raised by a unique constraint
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let constraint = db.constraint().unwrap_or("unnamed").to_string();
            if db.is_unique_violation() {
                return StoreError::Conflict { constraint };
            }
            if db.is_foreign_key_violation() {
                return StoreError::ForeignKey { constraint };
            }
        }

        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StoreError::Unavailable(err.to_string())
            }
            sqlx::Error::Io(io) => StoreError::Unavailable(io.to_string()),
            other => StoreError::Database(other),
        }
    }
}

impl DomainError for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Conflict { .. } => ErrorKind::Conflict,
            StoreError::NotFound => ErrorKind::NotFound,
            StoreError::ForeignKey { .. } => ErrorKind::Validation,
            StoreError::InvalidData(_)
            | StoreError::Unavailable(_)
            | StoreError::Timeout(_)
            | StoreError::Database(_) => ErrorKind::Infrastructure,
        }
    }
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_pool_errors_map_to_unavailable() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_conflict_message_hides_constraint() {
        let err = StoreError::Conflict {
            constraint: "users_referral_code_key".to_string(),
        };
        assert!(err.is_conflict());
        assert_eq!(
            err.client_message(),
            "A record with this information already exists"
        );
        assert!(!err.to_string().contains("users_referral_code_key"));

        let err = StoreError::ForeignKey {
            constraint: "referrals_referrer_id_fkey".to_string(),
        };
        assert!(!err.client_message().contains("fkey"));
    }
}
