//! Withdrawal data models.

use crate::auth::UserId;
use crate::utils::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Withdraw request ID type
pub type WithdrawId = i64;

/// Payout rail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawMethod {
    Telebirr,
    Cbe,
}

impl WithdrawMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawMethod::Telebirr => "telebirr",
            WithdrawMethod::Cbe => "cbe",
        }
    }
}

impl fmt::Display for WithdrawMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "telebirr" => Ok(WithdrawMethod::Telebirr),
            "cbe" => Ok(WithdrawMethod::Cbe),
            other => Err(format!("unsupported withdrawal method '{other}'")),
        }
    }
}

/// Withdraw request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawStatus {
    Pending,
    Completed,
    Rejected,
}

impl WithdrawStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawStatus::Pending => "pending",
            WithdrawStatus::Completed => "completed",
            WithdrawStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for WithdrawStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawStatus::Pending),
            "completed" => Ok(WithdrawStatus::Completed),
            "rejected" => Ok(WithdrawStatus::Rejected),
            other => Err(format!("unknown withdrawal status '{other}'")),
        }
    }
}

/// Withdraw request model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub id: WithdrawId,
    pub user_id: UserId,
    pub method: WithdrawMethod,
    pub amount: Amount,
    pub account_info: String,
    pub status: WithdrawStatus,
    pub created_at: DateTime<Utc>,
}

/// Insert model for a withdraw request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWithdrawRequest {
    pub user_id: UserId,
    pub method: WithdrawMethod,
    pub amount: Amount,
    pub account_info: String,
}

/// Result of the balance-checked insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WithdrawOutcome {
    Created(WithdrawRequest),
    InsufficientBalance { available: Amount },
}
