//! Report error types.

use crate::auth::UserId;
use crate::db::StoreError;
use crate::errors::{DomainError, ErrorKind};
use thiserror::Error;

/// Report errors
///
/// Listing reads fall back instead of failing, so storage errors only
/// surface from single-account reads.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Admin access required")]
    Forbidden,

    #[error("User {0} not found")]
    UserNotFound(UserId),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError for ReportError {
    fn kind(&self) -> ErrorKind {
        match self {
            ReportError::Forbidden => ErrorKind::Forbidden,
            ReportError::UserNotFound(_) => ErrorKind::NotFound,
            ReportError::Store(err) => err.kind(),
        }
    }
}

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;
