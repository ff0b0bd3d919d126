//! Referral module: edges between members, code allocation and settlement.
//!
//! A referral edge links the member whose code was used (referrer) to the
//! member who signed up with it (referred). At most one edge exists per pair;
//! creating it again is a no-op. Completing an edge credits its reward to the
//! referrer exactly once.

pub mod code;
pub mod errors;
pub mod manager;
pub mod models;

pub use code::{CodeGenerator, MAX_CODE_ATTEMPTS, allocate_referral_code, default_generator};
pub use errors::{ReferralError, ReferralResult};
pub use manager::{REFERRAL_REWARD, ReferralManager};
pub use models::{
    CompletionOutcome, NewReferral, Referral, ReferralActivityRow, ReferralDetail, ReferralId,
    ReferralStatus,
};
