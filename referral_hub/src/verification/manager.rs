//! Payment-proof verification workflow.
//!
//! A signup creates an unverified user together with a pending proof. An
//! administrator then moves the proof to `approved` or `rejected`; only the
//! pending -> approved transition verifies the user and credits the reward.

use super::{
    errors::{VerificationError, VerificationResult},
    models::{
        PaymentProof, PaymentProofView, ProofId, ProofResolution, ProofStatus, ResolveOutcome,
        SignupReceipt, SignupRequest, VerificationStatus,
    },
};
use crate::auth::{MIN_PASSWORD_LEN, NewUser, PepperedHasher, Principal, Role, UserId};
use crate::db::{
    DEFAULT_TRANSACTION_TIMEOUT, PaymentProofRepository, Repositories, StoreError, UserRepository,
    with_default_timeout, with_timeout,
};
use crate::referral::{CodeGenerator, ReferralManager, allocate_referral_code, default_generator};
use crate::utils::{
    Amount, MAX_ADMIN_NOTE_LEN, normalize_email, sanitize_input, validate_email, validate_phone,
    whole_units,
};
use std::sync::Arc;

/// Credited to a user when their payment proof is approved (50.00)
pub const REWARD_AMOUNT: Amount = whole_units(50);

/// Verification manager
#[derive(Clone)]
pub struct VerificationManager {
    users: Arc<dyn UserRepository>,
    proofs: Arc<dyn PaymentProofRepository>,
    referrals: ReferralManager,
    hasher: PepperedHasher,
    code_generator: CodeGenerator,
}

impl VerificationManager {
    /// Create a new verification manager
    ///
    /// # Arguments
    ///
    /// * `repos` - Repository handles
    /// * `hasher` - Password hasher shared with the auth manager
    pub fn new(repos: &Repositories, hasher: PepperedHasher) -> Self {
        Self {
            users: repos.users.clone(),
            proofs: repos.proofs.clone(),
            referrals: ReferralManager::new(repos),
            hasher,
            code_generator: default_generator(),
        }
    }

    /// Replace the referral-code source
    pub fn with_code_generator(mut self, generator: CodeGenerator) -> Self {
        self.code_generator = generator;
        self
    }

    /// Check a signup before its screenshot is stored
    ///
    /// Runs the field checks of [`Self::submit`] and the duplicate-email
    /// lookup. `image_url` is ignored.
    ///
    /// # Errors
    ///
    /// * `VerificationError::Validation` - Malformed input
    /// * `VerificationError::EmailTaken` - Email already registered
    pub async fn precheck(&self, request: &SignupRequest) -> VerificationResult<()> {
        let checked = check_signup_fields(request)?;
        if self.users.find_by_email(&checked.email).await?.is_some() {
            return Err(VerificationError::EmailTaken);
        }
        Ok(())
    }

    /// Register a new member together with their first payment proof
    ///
    /// The user and the proof are written in one unit of work. When the
    /// request carries the referral code of a verified member, a pending
    /// referral edge is added after the signup commits.
    ///
    /// # Errors
    ///
    /// * `VerificationError::Validation` - Malformed input
    /// * `VerificationError::EmailTaken` - Email already registered
    /// * `VerificationError::Referral` - No free referral code could be allocated
    pub async fn submit(&self, request: SignupRequest) -> VerificationResult<SignupReceipt> {
        let CheckedSignup {
            name,
            email,
            phone,
            telegram_username,
        } = check_signup_fields(&request)?;

        let image_url = request.image_url.trim();
        if image_url.is_empty() {
            return Err(VerificationError::Validation(
                "Payment screenshot is required".to_string(),
            ));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(VerificationError::EmailTaken);
        }

        let password_hash = self.hasher.hash(&request.password).await?;
        let referral_code =
            allocate_referral_code(self.users.as_ref(), &self.code_generator, Role::User).await?;

        let user = NewUser {
            email,
            name,
            password_hash,
            role: Role::User,
            referral_code,
            telegram_username,
            phone: Some(phone),
            is_verified: false,
            status: "active".to_string(),
        };

        let receipt = with_timeout(
            DEFAULT_TRANSACTION_TIMEOUT,
            self.users.create_user_with_proof(&user, image_url),
        )
        .await
        .map_err(|err| match err {
            // Lost a race with a concurrent signup for the same email
            StoreError::Conflict { constraint } if constraint.contains("email") => {
                VerificationError::EmailTaken
            }
            other => other.into(),
        })?;

        log::info!(
            "Signup created user {} with pending proof {}",
            receipt.user_id,
            receipt.proof_id
        );

        if let Some(code) = request.referral_code.as_deref().filter(|c| !c.trim().is_empty()) {
            if let Err(err) = self.referrals.link_signup(code, receipt.user_id).await {
                log::warn!(
                    "Could not link signup {} to referral code: {}",
                    receipt.user_id,
                    err
                );
            }
        }

        Ok(receipt)
    }

    /// Approve or reject a pending payment proof
    ///
    /// Approval verifies the owner and credits `REWARD_AMOUNT` to their
    /// balance and lifetime earnings in the same transaction. A proof that is
    /// no longer pending is left untouched.
    ///
    /// # Errors
    ///
    /// * `VerificationError::Forbidden` - Caller is not an administrator
    /// * `VerificationError::Validation` - Status is not terminal or note is too long
    /// * `VerificationError::ProofNotFound` - Unknown proof
    /// * `VerificationError::AlreadyResolved` - Proof was resolved before
    pub async fn resolve_proof(
        &self,
        admin: &Principal,
        proof_id: ProofId,
        status: &str,
        admin_note: Option<String>,
    ) -> VerificationResult<PaymentProof> {
        if !admin.is_admin() {
            log::warn!("User {} attempted to resolve proof {}", admin.id, proof_id);
            return Err(VerificationError::Forbidden);
        }

        let status = match status.parse::<ProofStatus>() {
            Ok(status) if status.is_terminal() => status,
            _ => {
                return Err(VerificationError::Validation(
                    "Status must be 'approved' or 'rejected'".to_string(),
                ));
            }
        };

        let admin_note = admin_note
            .as_deref()
            .map(sanitize_input)
            .filter(|note| !note.is_empty());
        if let Some(note) = &admin_note {
            if note.chars().count() > MAX_ADMIN_NOTE_LEN {
                return Err(VerificationError::Validation(format!(
                    "Admin note cannot exceed {MAX_ADMIN_NOTE_LEN} characters"
                )));
            }
        }

        let resolution = ProofResolution {
            proof_id,
            status,
            admin_id: admin.id,
            admin_note,
        };

        let outcome = with_timeout(
            DEFAULT_TRANSACTION_TIMEOUT,
            self.proofs.resolve(&resolution, REWARD_AMOUNT),
        )
        .await;

        match outcome {
            Ok(ResolveOutcome::Applied(proof)) => {
                log::info!(
                    "Proof {} {} by admin {} for user {}",
                    proof.id,
                    proof.status,
                    admin.id,
                    proof.user_id
                );
                Ok(proof)
            }
            Ok(ResolveOutcome::AlreadyResolved(proof)) => {
                log::warn!(
                    "Admin {} tried to resolve proof {} which is already {}",
                    admin.id,
                    proof.id,
                    proof.status
                );
                Err(VerificationError::AlreadyResolved {
                    status: proof.status,
                })
            }
            Err(StoreError::NotFound) => Err(VerificationError::ProofNotFound(proof_id)),
            Err(err) => {
                log::error!("Resolving proof {proof_id} failed: {err}");
                Err(err.into())
            }
        }
    }

    /// Most recent proof submitted by a user
    pub async fn latest_proof(&self, user_id: UserId) -> VerificationResult<Option<PaymentProof>> {
        Ok(self.proofs.find_latest_for_user(user_id).await?)
    }

    /// Review state of a user's latest proof
    ///
    /// # Errors
    ///
    /// * `VerificationError::UserNotFound` - Unknown user
    pub async fn check_status(&self, user_id: UserId) -> VerificationResult<VerificationStatus> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(VerificationError::UserNotFound(user_id))?;
        let latest = self.proofs.find_latest_for_user(user_id).await?;

        Ok(VerificationStatus {
            status: latest.as_ref().map(|proof| proof.status),
            admin_note: latest.and_then(|proof| proof.admin_note),
            is_verified: user.is_verified,
        })
    }

    /// Submit a new proof after a rejection
    ///
    /// # Errors
    ///
    /// * `VerificationError::UserNotFound` - Unknown user
    /// * `VerificationError::AlreadyVerified` - User is already verified
    /// * `VerificationError::ProofPending` - A proof is still awaiting review
    pub async fn submit_additional_proof(
        &self,
        user_id: UserId,
        image_url: &str,
    ) -> VerificationResult<PaymentProof> {
        let image_url = image_url.trim();
        if image_url.is_empty() {
            return Err(VerificationError::Validation(
                "Payment screenshot is required".to_string(),
            ));
        }

        self.check_resubmission(user_id).await?;

        let proof = self.proofs.create_proof(user_id, image_url).await?;
        log::info!("User {} submitted additional proof {}", user_id, proof.id);
        Ok(proof)
    }

    /// Whether a user may submit another proof right now
    ///
    /// # Errors
    ///
    /// Same as [`Self::submit_additional_proof`], minus the image check.
    pub async fn check_resubmission(&self, user_id: UserId) -> VerificationResult<()> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(VerificationError::UserNotFound(user_id))?;
        if user.is_verified {
            return Err(VerificationError::AlreadyVerified);
        }

        let latest = self.proofs.find_latest_for_user(user_id).await?;
        if latest.is_some_and(|proof| proof.status == ProofStatus::Pending) {
            return Err(VerificationError::ProofPending);
        }
        Ok(())
    }

    /// Every proof with its owner and reviewer, newest first
    ///
    /// Falls back to an empty list when storage fails.
    pub async fn list_proofs(&self, admin: &Principal) -> VerificationResult<Vec<PaymentProofView>> {
        if !admin.is_admin() {
            return Err(VerificationError::Forbidden);
        }

        match with_default_timeout(self.proofs.list_with_parties()).await {
            Ok(proofs) => Ok(proofs),
            Err(err) => {
                log::warn!("Payment proof listing fell back to empty: {err}");
                Ok(Vec::new())
            }
        }
    }
}

/// Normalized signup fields
struct CheckedSignup {
    name: String,
    email: String,
    phone: String,
    telegram_username: Option<String>,
}

fn check_signup_fields(request: &SignupRequest) -> VerificationResult<CheckedSignup> {
    let name = sanitize_input(&request.name);
    if name.is_empty() {
        return Err(VerificationError::Validation("Name is required".to_string()));
    }

    let email = normalize_email(&request.email);
    if !validate_email(&email) {
        return Err(VerificationError::Validation(
            "Invalid email address".to_string(),
        ));
    }

    if !validate_phone(&request.phone) {
        return Err(VerificationError::Validation(
            "Invalid phone number".to_string(),
        ));
    }
    let phone = request.phone.split_whitespace().collect();

    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(VerificationError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let telegram_username = request
        .telegram_username
        .as_deref()
        .map(sanitize_input)
        .filter(|handle| !handle.is_empty());

    Ok(CheckedSignup {
        name,
        email,
        phone,
        telegram_username,
    })
}
