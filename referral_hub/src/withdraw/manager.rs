//! Withdraw request creation.
//!
//! A request records intent only; the balance is not debited here.

use super::{
    errors::{WithdrawError, WithdrawResult},
    models::{NewWithdrawRequest, WithdrawMethod, WithdrawOutcome, WithdrawRequest},
};
use crate::auth::UserId;
use crate::db::{
    DEFAULT_TRANSACTION_TIMEOUT, Repositories, StoreError, WithdrawRepository, with_timeout,
};
use crate::utils::{Amount, sanitize_input, whole_units};
use std::sync::Arc;

/// Smallest amount that can be withdrawn (10.00)
pub const MIN_WITHDRAWAL: Amount = whole_units(10);

/// Withdraw manager
#[derive(Clone)]
pub struct WithdrawManager {
    withdrawals: Arc<dyn WithdrawRepository>,
}

impl WithdrawManager {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            withdrawals: repos.withdrawals.clone(),
        }
    }

    /// Create a pending withdraw request
    ///
    /// # Arguments
    ///
    /// * `user_id` - Requesting member
    /// * `method` - Payout rail name (`telebirr` or `cbe`)
    /// * `amount` - Amount in minor units
    /// * `account_info` - Destination account, sanitized before storage
    ///
    /// # Errors
    ///
    /// * `WithdrawError::InvalidMethod` - Unknown rail
    /// * `WithdrawError::BelowMinimum` - Amount under `MIN_WITHDRAWAL`
    /// * `WithdrawError::InsufficientBalance` - Amount exceeds the balance
    pub async fn request(
        &self,
        user_id: UserId,
        method: &str,
        amount: Amount,
        account_info: &str,
    ) -> WithdrawResult<WithdrawRequest> {
        let method: WithdrawMethod = method.trim().parse().map_err(WithdrawError::InvalidMethod)?;

        if amount <= 0 {
            return Err(WithdrawError::InvalidAmount);
        }
        if amount < MIN_WITHDRAWAL {
            return Err(WithdrawError::BelowMinimum {
                minimum: MIN_WITHDRAWAL,
            });
        }

        let account_info = sanitize_input(account_info);
        if account_info.is_empty() {
            return Err(WithdrawError::MissingAccountInfo);
        }

        let request = NewWithdrawRequest {
            user_id,
            method,
            amount,
            account_info,
        };

        match with_timeout(
            DEFAULT_TRANSACTION_TIMEOUT,
            self.withdrawals.create_request(&request),
        )
        .await
        {
            Ok(WithdrawOutcome::Created(created)) => {
                log::info!(
                    "Withdraw request {} for {} via {} by user {}",
                    created.id,
                    created.amount,
                    created.method,
                    user_id
                );
                Ok(created)
            }
            Ok(WithdrawOutcome::InsufficientBalance { available }) => {
                Err(WithdrawError::InsufficientBalance { available })
            }
            Err(StoreError::NotFound) => Err(WithdrawError::UserNotFound(user_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Requests made by a user, newest first
    pub async fn list_for_user(&self, user_id: UserId) -> WithdrawResult<Vec<WithdrawRequest>> {
        Ok(self.withdrawals.list_for_user(user_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn manager() -> WithdrawManager {
        WithdrawManager::new(&Repositories::from_store(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_rejects_unknown_method() {
        let err = manager()
            .request(1, "paypal", 2_000, "acct")
            .await
            .unwrap_err();
        assert!(matches!(err, WithdrawError::InvalidMethod(_)));
    }

    #[tokio::test]
    async fn test_rejects_small_amounts() {
        let withdrawals = manager();

        assert!(matches!(
            withdrawals.request(1, "cbe", 0, "acct").await,
            Err(WithdrawError::InvalidAmount)
        ));
        assert!(matches!(
            withdrawals.request(1, "cbe", 999, "acct").await,
            Err(WithdrawError::BelowMinimum { minimum: 1_000 })
        ));
    }

    #[tokio::test]
    async fn test_rejects_blank_account() {
        assert!(matches!(
            manager().request(1, "Telebirr", 2_000, " <> ").await,
            Err(WithdrawError::MissingAccountInfo)
        ));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        assert!(matches!(
            manager().request(42, "cbe", 2_000, "1000123456789").await,
            Err(WithdrawError::UserNotFound(42))
        ));
    }
}
