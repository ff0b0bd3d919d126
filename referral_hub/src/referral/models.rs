//! Referral data models.

use crate::auth::{UserId, UserSummary};
use crate::utils::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Referral ID type
pub type ReferralId = i64;

/// Referral status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferralStatus {
    Pending,
    Completed,
}

impl ReferralStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferralStatus::Pending => "pending",
            ReferralStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for ReferralStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferralStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReferralStatus::Pending),
            "completed" => Ok(ReferralStatus::Completed),
            other => Err(format!("unknown referral status '{other}'")),
        }
    }
}

/// Referral edge between two users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    pub referrer_id: UserId,
    pub referred_id: UserId,
    pub status: ReferralStatus,
    pub reward: Amount,
    pub created_at: DateTime<Utc>,
}

/// Insert model for a referral edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReferral {
    pub referrer_id: UserId,
    pub referred_id: UserId,
    pub status: ReferralStatus,
    pub reward: Amount,
}

/// Referral with the referred user's summary, for the referrer's dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferralDetail {
    #[serde(flatten)]
    pub referral: Referral,
    pub referred: UserSummary,
}

/// Referral with the referrer's summary, for the admin activity feed
#[derive(Debug, Clone)]
pub struct ReferralActivityRow {
    pub referral: Referral,
    pub referrer: UserSummary,
}

/// Result of completing a referral inside the storage transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// The referral was pending; it is now completed and the reward credited
    Completed(Referral),
    /// The referral had already been completed; nothing was written
    AlreadyCompleted(Referral),
}
