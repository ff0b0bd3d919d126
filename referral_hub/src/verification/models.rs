//! Payment proof data models.

use crate::auth::{UserId, UserSummary};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Payment proof ID type
pub type ProofId = i64;

/// Review state of a payment proof
///
/// `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProofStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProofStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofStatus::Pending => "pending",
            ProofStatus::Approved => "approved",
            ProofStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProofStatus::Pending)
    }
}

impl fmt::Display for ProofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProofStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProofStatus::Pending),
            "approved" => Ok(ProofStatus::Approved),
            "rejected" => Ok(ProofStatus::Rejected),
            other => Err(format!("unknown proof status '{other}'")),
        }
    }
}

/// Payment proof model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentProof {
    pub id: ProofId,
    pub user_id: UserId,
    pub image_url: String,
    pub status: ProofStatus,
    pub admin_id: Option<UserId>,
    pub admin_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payment proof with its owner and reviewer, for the admin queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentProofView {
    #[serde(flatten)]
    pub proof: PaymentProof,
    pub user: UserSummary,
    pub admin: Option<UserSummary>,
}

/// Verification submission from a prospective member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub telegram_username: Option<String>,
    pub password: String,
    /// URL returned by the image store for the uploaded screenshot
    pub image_url: String,
    /// Referral code of the member who invited this user
    pub referral_code: Option<String>,
}

/// Ids created by a successful submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupReceipt {
    pub user_id: UserId,
    pub proof_id: ProofId,
}

/// Validated admin decision on a proof
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofResolution {
    pub proof_id: ProofId,
    pub status: ProofStatus,
    pub admin_id: UserId,
    pub admin_note: Option<String>,
}

/// Result of applying a resolution inside the storage transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// The proof was pending and has been resolved
    Applied(PaymentProof),
    /// The proof was already terminal; nothing was written
    AlreadyResolved(PaymentProof),
}

/// Verification status as shown to the submitting user
///
/// `status` is `None` for accounts that never submitted a proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStatus {
    pub status: Option<ProofStatus>,
    pub admin_note: Option<String>,
    pub is_verified: bool,
}
