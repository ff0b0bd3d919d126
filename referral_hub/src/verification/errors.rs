//! Verification workflow error types.

use super::models::{ProofId, ProofStatus};
use crate::auth::{AuthError, UserId};
use crate::db::StoreError;
use crate::errors::{DomainError, ErrorKind};
use crate::referral::ReferralError;
use thiserror::Error;

/// Verification errors
#[derive(Debug, Error)]
pub enum VerificationError {
    /// Malformed submission or decision
    #[error("{0}")]
    Validation(String),

    /// Email already registered
    #[error("An account with this email already exists")]
    EmailTaken,

    /// Proof does not exist
    #[error("Payment proof {0} not found")]
    ProofNotFound(ProofId),

    /// User does not exist
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Proof was resolved before; nothing changed
    #[error("Payment proof has already been {status}")]
    AlreadyResolved { status: ProofStatus },

    /// A new proof was submitted while one is still under review
    #[error("A payment proof is already awaiting review")]
    ProofPending,

    /// A new proof was submitted by a verified user
    #[error("Account is already verified")]
    AlreadyVerified,

    /// Caller is not an administrator
    #[error("Admin access required")]
    Forbidden,

    /// Password hashing failed
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Referral code allocation failed
    #[error(transparent)]
    Referral(#[from] ReferralError),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError for VerificationError {
    fn kind(&self) -> ErrorKind {
        match self {
            VerificationError::Validation(_) => ErrorKind::Validation,
            VerificationError::EmailTaken
            | VerificationError::AlreadyResolved { .. }
            | VerificationError::ProofPending
            | VerificationError::AlreadyVerified => ErrorKind::Conflict,
            VerificationError::ProofNotFound(_) | VerificationError::UserNotFound(_) => {
                ErrorKind::NotFound
            }
            VerificationError::Forbidden => ErrorKind::Forbidden,
            VerificationError::Auth(err) => err.kind(),
            VerificationError::Referral(err) => err.kind(),
            VerificationError::Store(err) => err.kind(),
        }
    }
}

/// Result type for verification operations
pub type VerificationResult<T> = Result<T, VerificationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_resolved_is_conflict() {
        let err = VerificationError::AlreadyResolved {
            status: ProofStatus::Approved,
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.to_string(), "Payment proof has already been approved");
    }

    #[test]
    fn test_storage_detail_never_reaches_client() {
        let err = VerificationError::Store(StoreError::Unavailable("10.0.0.3:5432".to_string()));
        assert_eq!(err.client_message(), "Internal server error");
    }
}
