//! Referral error types.

use super::models::ReferralId;
use crate::db::StoreError;
use crate::errors::{DomainError, ErrorKind};
use thiserror::Error;

/// Referral errors
#[derive(Debug, Error)]
pub enum ReferralError {
    /// Referrer and referred are the same user
    #[error("A user cannot refer themselves")]
    SelfReferral,

    /// Negative reward
    #[error("Referral reward cannot be negative")]
    InvalidReward,

    /// Every allocation attempt collided with an existing code
    #[error("Failed to generate unique referral code after {attempts} attempts")]
    CodeExhausted { attempts: usize },

    /// Referral does not exist
    #[error("Referral {0} not found")]
    NotFound(ReferralId),

    /// Referral was completed before
    #[error("Referral {0} is already completed")]
    AlreadyCompleted(ReferralId),

    /// Caller is not an administrator
    #[error("Admin access required")]
    Forbidden,

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError for ReferralError {
    fn kind(&self) -> ErrorKind {
        match self {
            ReferralError::SelfReferral | ReferralError::InvalidReward => ErrorKind::Validation,
            ReferralError::CodeExhausted { .. } => ErrorKind::Infrastructure,
            ReferralError::NotFound(_) => ErrorKind::NotFound,
            ReferralError::AlreadyCompleted(_) => ErrorKind::Conflict,
            ReferralError::Forbidden => ErrorKind::Forbidden,
            ReferralError::Store(err) => err.kind(),
        }
    }
}

/// Result type for referral operations
pub type ReferralResult<T> = Result<T, ReferralError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ReferralError::SelfReferral.kind(), ErrorKind::Validation);
        assert_eq!(ReferralError::AlreadyCompleted(3).kind(), ErrorKind::Conflict);
        assert_eq!(
            ReferralError::Store(StoreError::NotFound).kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_exhausted_message_is_sanitized() {
        let err = ReferralError::CodeExhausted { attempts: 5 };
        assert!(err.to_string().contains("unique referral code"));
        assert_eq!(err.client_message(), "Internal server error");
    }
}
