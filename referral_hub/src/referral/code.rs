//! Referral-code allocation against storage.

use super::errors::{ReferralError, ReferralResult};
use crate::auth::Role;
use crate::db::UserRepository;
use crate::utils::generate_referral_code;
use std::sync::Arc;

/// Maximum number of candidates tried before allocation gives up
pub const MAX_CODE_ATTEMPTS: usize = 5;

/// Source of candidate codes
pub type CodeGenerator = Arc<dyn Fn(Role) -> String + Send + Sync>;

/// Generator backed by [`generate_referral_code`]
pub fn default_generator() -> CodeGenerator {
    Arc::new(generate_referral_code)
}

/// Draw candidates until one is free in storage
///
/// # Errors
///
/// * `ReferralError::CodeExhausted` - All `MAX_CODE_ATTEMPTS` candidates were taken
/// * `ReferralError::Store` - The uniqueness check failed
pub async fn allocate_referral_code(
    users: &dyn UserRepository,
    generator: &CodeGenerator,
    role: Role,
) -> ReferralResult<String> {
    for attempt in 1..=MAX_CODE_ATTEMPTS {
        let candidate = generator(role);
        if !users.referral_code_exists(&candidate).await? {
            return Ok(candidate);
        }
        log::debug!("Referral code collision on attempt {attempt}");
    }

    log::error!("Referral code space exhausted after {MAX_CODE_ATTEMPTS} attempts");
    Err(ReferralError::CodeExhausted {
        attempts: MAX_CODE_ATTEMPTS,
    })
}
