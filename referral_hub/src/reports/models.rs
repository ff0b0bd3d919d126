//! Read models for dashboards and admin listings.

use crate::auth::{User, UserId};
use crate::referral::ReferralDetail;
use crate::utils::Amount;
use crate::withdraw::WithdrawRequest;
use serde::{Deserialize, Serialize};

/// Admin dashboard headline numbers
///
/// `Default` is the all-zero value served when storage is unavailable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: i64,
    pub active_referrals: i64,
    pub total_payouts: Amount,
    pub recent_activities: Vec<RecentActivity>,
}

/// Entry in the admin activity feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentActivity {
    pub user: String,
    pub activity: String,
    pub date: String,
    pub status: String,
}

/// Row of the admin user table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserListing {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub telegram: String,
    pub join_date: String,
    pub status: String,
    pub is_verified: bool,
    pub balance: Amount,
    pub total_earnings: Amount,
    pub referral_code: String,
}

/// Row of the admin administrator table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminListing {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub join_date: String,
    pub status: String,
    pub is_verified: bool,
}

/// Per-referrer totals as read from storage
#[derive(Debug, Clone)]
pub struct ReferrerCounts {
    pub user: User,
    pub total: i64,
    pub successful: i64,
    pub pending: i64,
}

/// Row of the admin referral table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferrerSummary {
    pub user_id: UserId,
    pub user: String,
    pub total: i64,
    pub successful: i64,
    pub pending: i64,
    pub earned: Amount,
    pub status: String,
}

/// Member dashboard: the user with their referrals and withdrawals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDashboard {
    pub user: User,
    pub referrals: Vec<ReferralDetail>,
    pub withdraw_requests: Vec<WithdrawRequest>,
    pub successful_referrals: usize,
    pub pending_referrals: usize,
}
