//! # Referral Hub
//!
//! Core of a referral program: members pay an entry fee, upload proof of
//! payment, earn a flat reward per successful referral and withdraw their
//! balance through Telebirr or CBE. Administrators review the proofs.
//!
//! ## Workflow
//!
//! 1. **Signup** creates an unverified user and a pending payment proof in
//!    one unit of work ([`verification::VerificationManager::submit`]).
//! 2. **Review** moves the proof to approved or rejected. Approval verifies
//!    the user and credits the reward once; a proof is never resolved twice
//!    ([`verification::VerificationManager::resolve_proof`]).
//! 3. **Referrals** link a new signup to the verified member whose code it
//!    used; completing the edge credits the referrer
//!    ([`referral::ReferralManager`]).
//! 4. **Withdrawals** record payout requests against the earned balance
//!    ([`withdraw::WithdrawManager`]).
//!
//! ## Core Modules
//!
//! - [`db`]: Repository traits with PostgreSQL and in-memory implementations
//! - [`auth`]: Login, session tokens and administrator accounts
//! - [`reports`]: Admin statistics and listings with per-read fallbacks
//! - [`utils`]: Validation, sanitization, referral codes, currency
//!
//! ## Example
//!
//! ```
//! use referral_hub::utils::{format_currency, whole_units};
//!
//! assert_eq!(format_currency(whole_units(50)), "ETB 50.00");
//! ```

/// Authentication and sessions.
pub mod auth;

/// Data-access layer.
pub mod db;

/// Error taxonomy shared by all modules.
pub mod errors;

/// Referral edges and settlement.
pub mod referral;

/// Admin and member read models.
pub mod reports;

/// Payment screenshot storage.
pub mod storage;

/// Validation and formatting helpers.
pub mod utils;

/// Signup and payment-proof review.
pub mod verification;

/// Payout requests.
pub mod withdraw;

pub use auth::{AuthError, AuthManager, Principal, Role, User, UserId};
pub use db::{Database, DatabaseConfig, MemoryStore, Repositories, StoreError};
pub use errors::{DomainError, ErrorKind};
pub use referral::{ReferralError, ReferralManager};
pub use reports::{ReportError, ReportManager};
pub use storage::{ImageStore, LocalImageStore, StorageError};
pub use utils::Amount;
pub use verification::{REWARD_AMOUNT, VerificationError, VerificationManager};
pub use withdraw::{WithdrawError, WithdrawManager};
