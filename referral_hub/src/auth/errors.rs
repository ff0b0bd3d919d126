//! Authentication error types.

use crate::db::StoreError;
use crate::errors::{DomainError, ErrorKind};
use crate::referral::ReferralError;
use thiserror::Error;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email does not match the address pattern
    #[error("Invalid email address")]
    InvalidEmail,

    /// Display name rejected
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// Password too weak
    #[error("Password too weak: {0}")]
    WeakPassword(String),

    /// Unknown email or wrong password
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Email already exists
    #[error("An account with this email already exists")]
    EmailTaken,

    /// JWT could not be decoded or has expired
    #[error("JWT error: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    /// No session presented
    #[error("Authentication required")]
    Unauthorized,

    /// Authenticated but not an administrator
    #[error("Admin access required")]
    Forbidden,

    /// Password hashing failed
    #[error("Password hashing failed")]
    HashingFailed,

    /// Referral code allocation failed
    #[error(transparent)]
    Referral(#[from] ReferralError),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError for AuthError {
    fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidEmail | AuthError::InvalidName(_) | AuthError::WeakPassword(_) => {
                ErrorKind::Validation
            }
            AuthError::InvalidCredentials | AuthError::InvalidToken(_) | AuthError::Unauthorized => {
                ErrorKind::Unauthorized
            }
            AuthError::EmailTaken => ErrorKind::Conflict,
            AuthError::Forbidden => ErrorKind::Forbidden,
            AuthError::HashingFailed => ErrorKind::Infrastructure,
            AuthError::Referral(err) => err.kind(),
            AuthError::Store(err) => err.kind(),
        }
    }

    /// Token errors are reduced to a generic message so the token structure
    /// is never described to the caller.
    fn client_message(&self) -> String {
        match self {
            AuthError::InvalidToken(_) => "Authentication failed".to_string(),
            _ if self.kind() == ErrorKind::Infrastructure => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Result type for authentication operations
pub type AuthResult<T> = Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_errors_are_sanitized() {
        let err = AuthError::Store(StoreError::Unavailable("pool closed".to_string()));
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_credentials_error_does_not_reveal_which_part_failed() {
        assert_eq!(
            AuthError::InvalidCredentials.client_message(),
            "Invalid email or password"
        );
    }
}
