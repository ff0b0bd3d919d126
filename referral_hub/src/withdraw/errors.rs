//! Withdrawal error types.

use crate::auth::UserId;
use crate::db::StoreError;
use crate::errors::{DomainError, ErrorKind};
use crate::utils::{Amount, format_currency};
use thiserror::Error;

/// Withdrawal errors
#[derive(Debug, Error)]
pub enum WithdrawError {
    /// Unknown payout rail
    #[error("Invalid withdrawal method: {0}")]
    InvalidMethod(String),

    /// Zero or negative amount
    #[error("Withdrawal amount must be positive")]
    InvalidAmount,

    /// Amount below the payout minimum
    #[error("Minimum withdrawal amount is {}", format_currency(*.minimum))]
    BelowMinimum { minimum: Amount },

    /// Amount above the current balance
    #[error("Insufficient balance: available {}", format_currency(*.available))]
    InsufficientBalance { available: Amount },

    /// Account details missing
    #[error("Account information is required")]
    MissingAccountInfo,

    /// User does not exist
    #[error("User {0} not found")]
    UserNotFound(UserId),

    /// Storage failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError for WithdrawError {
    fn kind(&self) -> ErrorKind {
        match self {
            WithdrawError::InvalidMethod(_)
            | WithdrawError::InvalidAmount
            | WithdrawError::BelowMinimum { .. }
            | WithdrawError::InsufficientBalance { .. }
            | WithdrawError::MissingAccountInfo => ErrorKind::Validation,
            WithdrawError::UserNotFound(_) => ErrorKind::NotFound,
            WithdrawError::Store(err) => err.kind(),
        }
    }
}

/// Result type for withdrawal operations
pub type WithdrawResult<T> = Result<T, WithdrawError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_format_amounts() {
        assert_eq!(
            WithdrawError::BelowMinimum { minimum: 1_000 }.to_string(),
            "Minimum withdrawal amount is ETB 10.00"
        );
        assert_eq!(
            WithdrawError::InsufficientBalance { available: 5_000 }.to_string(),
            "Insufficient balance: available ETB 50.00"
        );
    }
}
