//! Repository trait definitions for testability and dependency injection.
//!
//! Each trait groups the operations on one aggregate. Methods that must be
//! atomic (signup, proof resolution, referral completion, withdraw requests)
//! are single trait methods so every implementation owns its own unit of work.

use async_trait::async_trait;
use std::sync::Arc;

use super::errors::StoreResult;
use crate::auth::{NewUser, Role, User, UserCredentials, UserId};
use crate::referral::{
    CompletionOutcome, NewReferral, Referral, ReferralActivityRow, ReferralDetail, ReferralId,
    ReferralStatus,
};
use crate::reports::ReferrerCounts;
use crate::utils::Amount;
use crate::verification::{
    PaymentProof, PaymentProofView, ProofResolution, ResolveOutcome, SignupReceipt,
};
use crate::withdraw::{NewWithdrawRequest, WithdrawOutcome, WithdrawRequest};

/// User repository operations
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Cheap round trip used by health checks
    async fn ping(&self) -> StoreResult<()>;

    /// Find user by ID
    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>>;

    /// Find user by normalized (lower-case) email
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Find user and password hash by normalized email
    async fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>>;

    /// Find user by upper-case referral code
    async fn find_by_referral_code(&self, code: &str) -> StoreResult<Option<User>>;

    /// Whether a referral code is already taken
    async fn referral_code_exists(&self, code: &str) -> StoreResult<bool>;

    /// Insert a single user
    async fn create_user(&self, user: &NewUser) -> StoreResult<User>;

    /// Insert a user and their first pending payment proof atomically
    async fn create_user_with_proof(
        &self,
        user: &NewUser,
        image_url: &str,
    ) -> StoreResult<SignupReceipt>;

    /// List users with a role, newest first
    async fn list_by_role(&self, role: Role) -> StoreResult<Vec<User>>;

    /// Count users with a role
    async fn count_by_role(&self, role: Role) -> StoreResult<i64>;
}

/// Payment proof repository operations
#[async_trait]
pub trait PaymentProofRepository: Send + Sync {
    /// Insert a pending proof for an existing user
    async fn create_proof(&self, user_id: UserId, image_url: &str) -> StoreResult<PaymentProof>;

    /// Most recent proof for a user
    async fn find_latest_for_user(&self, user_id: UserId) -> StoreResult<Option<PaymentProof>>;

    /// All proofs with owner and reviewer, newest first
    async fn list_with_parties(&self) -> StoreResult<Vec<PaymentProofView>>;

    /// Apply a resolution in one transaction
    ///
    /// Locks the proof, leaves it untouched unless it is pending, writes the
    /// new status with the admin fields and, for approvals, marks the owner
    /// verified and credits `reward` to balance and total earnings.
    ///
    /// # Errors
    ///
    /// * `StoreError::NotFound` - The proof does not exist
    async fn resolve(
        &self,
        resolution: &ProofResolution,
        reward: Amount,
    ) -> StoreResult<ResolveOutcome>;
}

/// Referral repository operations
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Insert a referral edge
    ///
    /// # Errors
    ///
    /// * `StoreError::Conflict` - The (referrer, referred) pair already exists
    async fn create_referral(&self, referral: &NewReferral) -> StoreResult<Referral>;

    /// Complete a pending referral and credit its reward to the referrer
    async fn complete_referral(&self, referral_id: ReferralId) -> StoreResult<CompletionOutcome>;

    /// Referrals made by a user, newest first
    async fn list_for_referrer(&self, referrer_id: UserId) -> StoreResult<Vec<ReferralDetail>>;

    /// Count referrals with a status
    async fn count_by_status(&self, status: ReferralStatus) -> StoreResult<i64>;

    /// Latest referrals with their referrer
    async fn recent_with_referrer(&self, limit: i64) -> StoreResult<Vec<ReferralActivityRow>>;

    /// Referral totals for every member, newest member first
    async fn referrer_counts(&self) -> StoreResult<Vec<ReferrerCounts>>;
}

/// Withdraw request repository operations
#[async_trait]
pub trait WithdrawRepository: Send + Sync {
    /// Insert a pending request if the user's balance covers it
    ///
    /// # Errors
    ///
    /// * `StoreError::NotFound` - The user does not exist
    async fn create_request(&self, request: &NewWithdrawRequest) -> StoreResult<WithdrawOutcome>;

    /// Requests made by a user, newest first
    async fn list_for_user(&self, user_id: UserId) -> StoreResult<Vec<WithdrawRequest>>;

    /// Sum of completed payouts
    async fn total_completed(&self) -> StoreResult<Amount>;
}

/// Bundle of repository handles injected into the workflow managers
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub proofs: Arc<dyn PaymentProofRepository>,
    pub referrals: Arc<dyn ReferralRepository>,
    pub withdrawals: Arc<dyn WithdrawRepository>,
}

impl Repositories {
    /// Use one store for every repository
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserRepository
            + PaymentProofRepository
            + ReferralRepository
            + WithdrawRepository
            + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            proofs: store.clone(),
            referrals: store.clone(),
            withdrawals: store,
        }
    }
}
