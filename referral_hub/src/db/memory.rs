//! In-memory implementation of every repository.
//!
//! Multi-row writes run against a staged copy of the state that replaces the
//! live state only when the whole unit succeeds, so a failure part-way leaves
//! nothing behind. Faults can be injected to exercise outage handling.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::errors::{StoreError, StoreResult};
use super::repository::{
    PaymentProofRepository, ReferralRepository, UserRepository, WithdrawRepository,
};
use crate::auth::{NewUser, Role, User, UserCredentials, UserId};
use crate::referral::{
    CompletionOutcome, NewReferral, Referral, ReferralActivityRow, ReferralDetail, ReferralId,
    ReferralStatus,
};
use crate::reports::ReferrerCounts;
use crate::utils::Amount;
use crate::verification::{
    PaymentProof, PaymentProofView, ProofId, ProofResolution, ProofStatus, ResolveOutcome,
    SignupReceipt,
};
use crate::withdraw::{
    NewWithdrawRequest, WithdrawId, WithdrawOutcome, WithdrawRequest, WithdrawStatus,
};

/// Point inside a unit of work where an injected failure fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultPoint {
    /// After the user row of a signup is written, before its proof
    SignupProofInsert,
    /// After a proof is marked approved, before the owner is credited
    RewardCredit,
    /// After a referral is marked completed, before the referrer is credited
    ReferralCredit,
    /// Before a withdraw request is written
    WithdrawInsert,
    /// When the total of completed payouts is read
    PayoutTotal,
}

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    users: BTreeMap<UserId, StoredUser>,
    proofs: BTreeMap<ProofId, PaymentProof>,
    referrals: BTreeMap<ReferralId, Referral>,
    withdrawals: BTreeMap<WithdrawId, WithdrawRequest>,
    last_id: i64,
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn summary(&self, user_id: UserId) -> StoreResult<crate::auth::UserSummary> {
        self.users
            .get(&user_id)
            .map(|stored| stored.user.summary())
            .ok_or_else(|| StoreError::InvalidData(format!("dangling user reference {user_id}")))
    }

    fn insert_user(&mut self, new: &NewUser) -> StoreResult<User> {
        if self.users.values().any(|s| s.user.email == new.email) {
            return Err(StoreError::Conflict {
                constraint: "users_email_key".to_string(),
            });
        }
        if self
            .users
            .values()
            .any(|s| s.user.referral_code == new.referral_code)
        {
            return Err(StoreError::Conflict {
                constraint: "users_referral_code_key".to_string(),
            });
        }

        let user = User {
            id: self.next_id(),
            email: new.email.clone(),
            name: new.name.clone(),
            role: new.role,
            referral_code: new.referral_code.clone(),
            telegram_username: new.telegram_username.clone(),
            phone: new.phone.clone(),
            is_verified: new.is_verified,
            status: new.status.clone(),
            balance: 0,
            total_earnings: 0,
            created_at: Utc::now(),
        };
        self.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: new.password_hash.clone(),
            },
        );
        Ok(user)
    }

    fn insert_proof(&mut self, user_id: UserId, image_url: &str) -> StoreResult<PaymentProof> {
        if !self.users.contains_key(&user_id) {
            return Err(StoreError::ForeignKey {
                constraint: "payment_proofs_user_id_fkey".to_string(),
            });
        }

        let now = Utc::now();
        let proof = PaymentProof {
            id: self.next_id(),
            user_id,
            image_url: image_url.to_string(),
            status: ProofStatus::Pending,
            admin_id: None,
            admin_note: None,
            created_at: now,
            updated_at: now,
        };
        self.proofs.insert(proof.id, proof.clone());
        Ok(proof)
    }

    fn credit(&mut self, user_id: UserId, amount: Amount) -> StoreResult<&mut User> {
        let stored = self.users.get_mut(&user_id).ok_or(StoreError::NotFound)?;
        stored.user.balance += amount;
        stored.user.total_earnings += amount;
        Ok(&mut stored.user)
    }
}

#[derive(Debug, Default)]
struct Faults {
    unavailable: bool,
    fail_at: Option<FaultPoint>,
    read_delay: Option<Duration>,
}

/// Repository implementation holding all rows in process memory
///
/// Clones share the same state, so a test can keep a handle for fault
/// injection while the managers own another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    faults: Arc<Mutex<Faults>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the database were down
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.unavailable = unavailable;
        }
    }

    /// Fail the next unit of work that reaches `point`
    pub fn fail_at(&self, point: FaultPoint) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.fail_at = Some(point);
        }
    }

    /// Delay every read by `delay`
    pub fn stall_reads(&self, delay: Duration) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.read_delay = Some(delay);
        }
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        if let Ok(mut faults) = self.faults.lock() {
            *faults = Faults::default();
        }
    }

    /// Set the status of a withdraw request, as a payout operator would
    pub fn set_withdraw_status(
        &self,
        withdraw_id: WithdrawId,
        status: WithdrawStatus,
    ) -> StoreResult<()> {
        self.transaction(|state| {
            let request = state
                .withdrawals
                .get_mut(&withdraw_id)
                .ok_or(StoreError::NotFound)?;
            request.status = status;
            Ok(())
        })
    }

    fn lock_faults(&self) -> StoreResult<MutexGuard<'_, Faults>> {
        self.faults
            .lock()
            .map_err(|_| StoreError::Unavailable("fault registry lock poisoned".to_string()))
    }

    fn lock_state(&self) -> StoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.lock_faults()?.unavailable {
            return Err(StoreError::Unavailable(
                "memory store is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn trip(&self, point: FaultPoint) -> StoreResult<()> {
        let mut faults = self.lock_faults()?;
        if faults.fail_at == Some(point) {
            faults.fail_at = None;
            return Err(StoreError::Unavailable(format!(
                "injected failure at {point:?}"
            )));
        }
        Ok(())
    }

    async fn read<T>(&self, f: impl FnOnce(&MemoryState) -> StoreResult<T>) -> StoreResult<T> {
        self.check_available()?;
        let delay = self.lock_faults()?.read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let state = self.lock_state()?;
        f(&state)
    }

    fn transaction<T>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> StoreResult<T>,
    ) -> StoreResult<T> {
        self.check_available()?;
        let mut live = self.lock_state()?;
        let mut staged = live.clone();
        let out = f(&mut staged)?;
        *live = staged;
        Ok(out)
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        self.read(|_| Ok(())).await
    }

    async fn find_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        self.read(|state| Ok(state.users.get(&user_id).map(|s| s.user.clone())))
            .await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.read(|state| {
            Ok(state
                .users
                .values()
                .find(|s| s.user.email == email)
                .map(|s| s.user.clone()))
        })
        .await
    }

    async fn find_credentials(&self, email: &str) -> StoreResult<Option<UserCredentials>> {
        self.read(|state| {
            Ok(state
                .users
                .values()
                .find(|s| s.user.email == email)
                .map(|s| UserCredentials {
                    user: s.user.clone(),
                    password_hash: s.password_hash.clone(),
                }))
        })
        .await
    }

    async fn find_by_referral_code(&self, code: &str) -> StoreResult<Option<User>> {
        self.read(|state| {
            Ok(state
                .users
                .values()
                .find(|s| s.user.referral_code == code)
                .map(|s| s.user.clone()))
        })
        .await
    }

    async fn referral_code_exists(&self, code: &str) -> StoreResult<bool> {
        self.read(|state| Ok(state.users.values().any(|s| s.user.referral_code == code)))
            .await
    }

    async fn create_user(&self, user: &NewUser) -> StoreResult<User> {
        self.transaction(|state| state.insert_user(user))
    }

    async fn create_user_with_proof(
        &self,
        user: &NewUser,
        image_url: &str,
    ) -> StoreResult<SignupReceipt> {
        self.transaction(|state| {
            let created = state.insert_user(user)?;
            self.trip(FaultPoint::SignupProofInsert)?;
            let proof = state.insert_proof(created.id, image_url)?;
            Ok(SignupReceipt {
                user_id: created.id,
                proof_id: proof.id,
            })
        })
    }

    async fn list_by_role(&self, role: Role) -> StoreResult<Vec<User>> {
        self.read(|state| {
            let mut users: Vec<User> = state
                .users
                .values()
                .filter(|s| s.user.role == role)
                .map(|s| s.user.clone())
                .collect();
            newest_first(&mut users, |u| (u.created_at, u.id));
            Ok(users)
        })
        .await
    }

    async fn count_by_role(&self, role: Role) -> StoreResult<i64> {
        self.read(|state| {
            Ok(state.users.values().filter(|s| s.user.role == role).count() as i64)
        })
        .await
    }
}

#[async_trait]
impl PaymentProofRepository for MemoryStore {
    async fn create_proof(&self, user_id: UserId, image_url: &str) -> StoreResult<PaymentProof> {
        self.transaction(|state| state.insert_proof(user_id, image_url))
    }

    async fn find_latest_for_user(&self, user_id: UserId) -> StoreResult<Option<PaymentProof>> {
        self.read(|state| {
            Ok(state
                .proofs
                .values()
                .filter(|p| p.user_id == user_id)
                .max_by_key(|p| (p.created_at, p.id))
                .cloned())
        })
        .await
    }

    async fn list_with_parties(&self) -> StoreResult<Vec<PaymentProofView>> {
        self.read(|state| {
            let mut views = state
                .proofs
                .values()
                .map(|proof| {
                    Ok(PaymentProofView {
                        user: state.summary(proof.user_id)?,
                        admin: proof.admin_id.map(|id| state.summary(id)).transpose()?,
                        proof: proof.clone(),
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            newest_first(&mut views, |v| (v.proof.created_at, v.proof.id));
            Ok(views)
        })
        .await
    }

    async fn resolve(
        &self,
        resolution: &ProofResolution,
        reward: Amount,
    ) -> StoreResult<ResolveOutcome> {
        self.transaction(|state| {
            if !state.users.contains_key(&resolution.admin_id) {
                return Err(StoreError::ForeignKey {
                    constraint: "payment_proofs_admin_id_fkey".to_string(),
                });
            }

            let proof = state
                .proofs
                .get_mut(&resolution.proof_id)
                .ok_or(StoreError::NotFound)?;
            if proof.status.is_terminal() {
                return Ok(ResolveOutcome::AlreadyResolved(proof.clone()));
            }

            proof.status = resolution.status;
            proof.admin_id = Some(resolution.admin_id);
            proof.admin_note = resolution.admin_note.clone();
            proof.updated_at = Utc::now();
            let updated = proof.clone();

            if resolution.status == ProofStatus::Approved {
                self.trip(FaultPoint::RewardCredit)?;
                let owner = state.credit(updated.user_id, reward)?;
                owner.is_verified = true;
            }

            Ok(ResolveOutcome::Applied(updated))
        })
    }
}

#[async_trait]
impl ReferralRepository for MemoryStore {
    async fn create_referral(&self, referral: &NewReferral) -> StoreResult<Referral> {
        self.transaction(|state| {
            if referral.referrer_id == referral.referred_id {
                return Err(StoreError::InvalidData(
                    "referrals_no_self_referral".to_string(),
                ));
            }
            for id in [referral.referrer_id, referral.referred_id] {
                if !state.users.contains_key(&id) {
                    return Err(StoreError::ForeignKey {
                        constraint: "referrals_user_fkey".to_string(),
                    });
                }
            }
            if state.referrals.values().any(|r| {
                r.referrer_id == referral.referrer_id && r.referred_id == referral.referred_id
            }) {
                return Err(StoreError::Conflict {
                    constraint: "referrals_referrer_id_referred_id_key".to_string(),
                });
            }

            let created = Referral {
                id: state.next_id(),
                referrer_id: referral.referrer_id,
                referred_id: referral.referred_id,
                status: referral.status,
                reward: referral.reward,
                created_at: Utc::now(),
            };
            state.referrals.insert(created.id, created.clone());
            Ok(created)
        })
    }

    async fn complete_referral(&self, referral_id: ReferralId) -> StoreResult<CompletionOutcome> {
        self.transaction(|state| {
            let referral = state
                .referrals
                .get_mut(&referral_id)
                .ok_or(StoreError::NotFound)?;
            if referral.status == ReferralStatus::Completed {
                return Ok(CompletionOutcome::AlreadyCompleted(referral.clone()));
            }

            referral.status = ReferralStatus::Completed;
            let updated = referral.clone();

            self.trip(FaultPoint::ReferralCredit)?;
            state.credit(updated.referrer_id, updated.reward)?;

            Ok(CompletionOutcome::Completed(updated))
        })
    }

    async fn list_for_referrer(&self, referrer_id: UserId) -> StoreResult<Vec<ReferralDetail>> {
        self.read(|state| {
            let mut details = state
                .referrals
                .values()
                .filter(|r| r.referrer_id == referrer_id)
                .map(|r| {
                    Ok(ReferralDetail {
                        referred: state.summary(r.referred_id)?,
                        referral: r.clone(),
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            newest_first(&mut details, |d| (d.referral.created_at, d.referral.id));
            Ok(details)
        })
        .await
    }

    async fn count_by_status(&self, status: ReferralStatus) -> StoreResult<i64> {
        self.read(|state| {
            Ok(state
                .referrals
                .values()
                .filter(|r| r.status == status)
                .count() as i64)
        })
        .await
    }

    async fn recent_with_referrer(&self, limit: i64) -> StoreResult<Vec<ReferralActivityRow>> {
        self.read(|state| {
            let mut rows = state
                .referrals
                .values()
                .map(|r| {
                    Ok(ReferralActivityRow {
                        referrer: state.summary(r.referrer_id)?,
                        referral: r.clone(),
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;
            newest_first(&mut rows, |row| (row.referral.created_at, row.referral.id));
            rows.truncate(usize::try_from(limit).unwrap_or(0));
            Ok(rows)
        })
        .await
    }

    async fn referrer_counts(&self) -> StoreResult<Vec<ReferrerCounts>> {
        self.read(|state| {
            let mut counts: Vec<ReferrerCounts> = state
                .users
                .values()
                .filter(|s| s.user.role == Role::User)
                .map(|s| {
                    let made = state
                        .referrals
                        .values()
                        .filter(|r| r.referrer_id == s.user.id);
                    let (mut total, mut successful, mut pending) = (0, 0, 0);
                    for referral in made {
                        total += 1;
                        match referral.status {
                            ReferralStatus::Completed => successful += 1,
                            ReferralStatus::Pending => pending += 1,
                        }
                    }
                    ReferrerCounts {
                        user: s.user.clone(),
                        total,
                        successful,
                        pending,
                    }
                })
                .collect();
            newest_first(&mut counts, |c| (c.user.created_at, c.user.id));
            Ok(counts)
        })
        .await
    }
}

#[async_trait]
impl WithdrawRepository for MemoryStore {
    async fn create_request(&self, request: &NewWithdrawRequest) -> StoreResult<WithdrawOutcome> {
        self.transaction(|state| {
            let available = state
                .users
                .get(&request.user_id)
                .map(|s| s.user.balance)
                .ok_or(StoreError::NotFound)?;
            if available < request.amount {
                return Ok(WithdrawOutcome::InsufficientBalance { available });
            }

            self.trip(FaultPoint::WithdrawInsert)?;
            let created = WithdrawRequest {
                id: state.next_id(),
                user_id: request.user_id,
                method: request.method,
                amount: request.amount,
                account_info: request.account_info.clone(),
                status: WithdrawStatus::Pending,
                created_at: Utc::now(),
            };
            state.withdrawals.insert(created.id, created.clone());
            Ok(WithdrawOutcome::Created(created))
        })
    }

    async fn list_for_user(&self, user_id: UserId) -> StoreResult<Vec<WithdrawRequest>> {
        self.read(|state| {
            let mut requests: Vec<WithdrawRequest> = state
                .withdrawals
                .values()
                .filter(|w| w.user_id == user_id)
                .cloned()
                .collect();
            newest_first(&mut requests, |w| (w.created_at, w.id));
            Ok(requests)
        })
        .await
    }

    async fn total_completed(&self) -> StoreResult<Amount> {
        self.trip(FaultPoint::PayoutTotal)?;
        self.read(|state| {
            Ok(state
                .withdrawals
                .values()
                .filter(|w| w.status == WithdrawStatus::Completed)
                .map(|w| w.amount)
                .sum())
        })
        .await
    }
}
