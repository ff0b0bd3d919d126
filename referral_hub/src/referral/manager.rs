//! Referral edge creation, lookup and settlement.

use super::{
    errors::{ReferralError, ReferralResult},
    models::{CompletionOutcome, NewReferral, Referral, ReferralDetail, ReferralId, ReferralStatus},
};
use crate::auth::{Principal, User, UserId};
use crate::db::{ReferralRepository, Repositories, StoreError, UserRepository};
use crate::utils::{Amount, whole_units};
use std::sync::Arc;

/// Reward attached to a referral created from a signup (50.00)
pub const REFERRAL_REWARD: Amount = whole_units(50);

/// Referral manager
#[derive(Clone)]
pub struct ReferralManager {
    users: Arc<dyn UserRepository>,
    referrals: Arc<dyn ReferralRepository>,
}

impl ReferralManager {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
            referrals: repos.referrals.clone(),
        }
    }

    /// Record that `referrer_id` brought in `referred_id`
    ///
    /// Returns `Ok(None)` when the edge already exists.
    ///
    /// # Errors
    ///
    /// * `ReferralError::SelfReferral` - Both ids are equal; storage is not touched
    /// * `ReferralError::InvalidReward` - Reward is negative
    pub async fn create_referral(
        &self,
        referrer_id: UserId,
        referred_id: UserId,
        status: ReferralStatus,
        reward: Amount,
    ) -> ReferralResult<Option<Referral>> {
        if referrer_id == referred_id {
            return Err(ReferralError::SelfReferral);
        }
        if reward < 0 {
            return Err(ReferralError::InvalidReward);
        }

        let edge = NewReferral {
            referrer_id,
            referred_id,
            status,
            reward,
        };

        match self.referrals.create_referral(&edge).await {
            Ok(referral) => {
                log::info!(
                    "Referral {} created: {} -> {}",
                    referral.id,
                    referrer_id,
                    referred_id
                );
                Ok(Some(referral))
            }
            Err(StoreError::Conflict { .. }) => {
                log::debug!("Referral {referrer_id} -> {referred_id} already exists");
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Complete a pending referral and credit its reward to the referrer
    ///
    /// # Errors
    ///
    /// * `ReferralError::Forbidden` - Caller is not an administrator
    /// * `ReferralError::NotFound` - Unknown referral
    /// * `ReferralError::AlreadyCompleted` - Referral was completed before
    pub async fn complete_referral(
        &self,
        admin: &Principal,
        referral_id: ReferralId,
    ) -> ReferralResult<Referral> {
        if !admin.is_admin() {
            return Err(ReferralError::Forbidden);
        }

        match self.referrals.complete_referral(referral_id).await {
            Ok(CompletionOutcome::Completed(referral)) => {
                log::info!(
                    "Referral {} completed by admin {}; credited {} to user {}",
                    referral.id,
                    admin.id,
                    referral.reward,
                    referral.referrer_id
                );
                Ok(referral)
            }
            Ok(CompletionOutcome::AlreadyCompleted(_)) => {
                Err(ReferralError::AlreadyCompleted(referral_id))
            }
            Err(StoreError::NotFound) => Err(ReferralError::NotFound(referral_id)),
            Err(err) => Err(err.into()),
        }
    }

    /// Look up the owner of a referral code, case-insensitively
    pub async fn find_referrer(&self, code: &str) -> ReferralResult<Option<User>> {
        let code = code.trim().to_uppercase();
        if code.is_empty() {
            return Ok(None);
        }
        Ok(self.users.find_by_referral_code(&code).await?)
    }

    /// Attach a new signup to the member whose code it used
    ///
    /// Unknown codes and unverified referrers are ignored.
    pub async fn link_signup(
        &self,
        code: &str,
        referred_id: UserId,
    ) -> ReferralResult<Option<Referral>> {
        let Some(referrer) = self.find_referrer(code).await? else {
            log::warn!("Signup {referred_id} used unknown referral code {code}");
            return Ok(None);
        };
        if !referrer.is_verified {
            log::warn!(
                "Signup {referred_id} used code of unverified user {}",
                referrer.id
            );
            return Ok(None);
        }

        self.create_referral(
            referrer.id,
            referred_id,
            ReferralStatus::Pending,
            REFERRAL_REWARD,
        )
        .await
    }

    /// Referrals made by a user, newest first
    pub async fn referrals_for(&self, referrer_id: UserId) -> ReferralResult<Vec<ReferralDetail>> {
        Ok(self.referrals.list_for_referrer(referrer_id).await?)
    }
}
