//! Validation and formatting helpers shared by every workflow.
//!
//! Everything here is pure: no storage, no clock except for referral code
//! synthesis, which mixes the current time with a random suffix.

use crate::auth::Role;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

/// Monetary amount in minor units (1 ETB = 100).
pub type Amount = i64;

/// Minor units per whole currency unit
pub const MINOR_UNITS: Amount = 100;

/// Currency code shown to users
pub const CURRENCY: &str = "ETB";

/// Maximum length of an admin note on a payment proof
pub const MAX_ADMIN_NOTE_LEN: usize = 500;

/// Minimum accepted phone number length (before pattern checks)
pub const MIN_PHONE_LEN: usize = 10;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{8,14}$").expect("phone pattern is valid"));

/// Check an email address has the `local@domain.tld` shape.
pub fn validate_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Check a phone number, ignoring embedded whitespace.
///
/// Numbers must be at least [`MIN_PHONE_LEN`] characters and match an
/// optional `+` followed by 9 to 15 digits with no leading zero.
pub fn validate_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace()).collect();
    compact.len() >= MIN_PHONE_LEN && PHONE_RE.is_match(&compact)
}

/// Trim and strip angle brackets from free-form user input.
pub fn sanitize_input(input: &str) -> String {
    input.trim().replace(['<', '>'], "")
}

/// Normalize an email address into its uniqueness key.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Build a candidate referral code.
///
/// The code is the role prefix (`USER` or `ADMIN`), the last six digits of the
/// millisecond clock and four random uppercase alphanumerics. Uniqueness is not
/// guaranteed; callers check storage and retry.
pub fn generate_referral_code(role: Role) -> String {
    let millis = chrono::Utc::now().timestamp_millis().unsigned_abs() % 1_000_000;
    let mut rng = rand::rng();
    let suffix: String = (0..4)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();

    format!("{}{millis:06}{suffix}", role.code_prefix())
}

/// Format an amount for display, e.g. `ETB 50.00`.
pub fn format_currency(amount: Amount) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!(
        "{CURRENCY} {sign}{}.{:02}",
        abs / MINOR_UNITS as u64,
        abs % MINOR_UNITS as u64
    )
}

/// Convert whole currency units to minor units.
pub const fn whole_units(units: i64) -> Amount {
    units * MINOR_UNITS
}
