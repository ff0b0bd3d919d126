//! Admin dashboards and member account reads.
//!
//! Listing and aggregate reads never fail outward: each storage call is
//! bounded by a timeout and replaced by its empty or zero default on error.

use super::{
    errors::{ReportError, ReportResult},
    models::{AdminListing, AdminStats, RecentActivity, ReferrerSummary, UserDashboard, UserListing},
};
use crate::auth::{Principal, Role, User, UserId};
use crate::db::{
    DEFAULT_QUERY_TIMEOUT, ReferralRepository, Repositories, StoreResult, UserRepository,
    WithdrawRepository, with_timeout,
};
use crate::referral::ReferralStatus;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Entries shown in the admin activity feed
pub const RECENT_ACTIVITY_LIMIT: i64 = 5;

const JOIN_DATE_FORMAT: &str = "%Y-%m-%d";

/// Report manager
#[derive(Clone)]
pub struct ReportManager {
    users: Arc<dyn UserRepository>,
    referrals: Arc<dyn ReferralRepository>,
    withdrawals: Arc<dyn WithdrawRepository>,
    branch_timeout: Duration,
}

/// Await a read, substituting `default` on error or timeout
async fn or_default<T, F>(label: &str, budget: Duration, future: F, default: T) -> T
where
    F: Future<Output = StoreResult<T>>,
{
    match with_timeout(budget, future).await {
        Ok(value) => value,
        Err(err) => {
            log::warn!("{label} read fell back to default: {err}");
            default
        }
    }
}

impl ReportManager {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: repos.users.clone(),
            referrals: repos.referrals.clone(),
            withdrawals: repos.withdrawals.clone(),
            branch_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Override the per-read time budget
    pub fn with_branch_timeout(mut self, timeout: Duration) -> Self {
        self.branch_timeout = timeout;
        self
    }

    /// Headline numbers for the admin dashboard
    ///
    /// The four reads run concurrently and fail independently: a failing
    /// branch contributes its zero value while the others are still reported.
    pub async fn stats(&self, admin: &Principal) -> ReportResult<AdminStats> {
        require_admin(admin)?;
        let budget = self.branch_timeout;

        let (total_users, active_referrals, total_payouts, recent) = tokio::join!(
            or_default("total users", budget, self.users.count_by_role(Role::User), 0),
            or_default(
                "active referrals",
                budget,
                self.referrals.count_by_status(ReferralStatus::Completed),
                0,
            ),
            or_default(
                "total payouts",
                budget,
                self.withdrawals.total_completed(),
                0,
            ),
            or_default(
                "recent activity",
                budget,
                self.referrals.recent_with_referrer(RECENT_ACTIVITY_LIMIT),
                Vec::new(),
            ),
        );

        let recent_activities = recent
            .into_iter()
            .map(|row| RecentActivity {
                user: row.referrer.name,
                activity: "Referral Signup".to_string(),
                date: row.referral.created_at.format(JOIN_DATE_FORMAT).to_string(),
                status: match row.referral.status {
                    ReferralStatus::Completed => "Completed",
                    ReferralStatus::Pending => "Pending",
                }
                .to_string(),
            })
            .collect();

        Ok(AdminStats {
            total_users,
            active_referrals,
            total_payouts,
            recent_activities,
        })
    }

    /// Member table for the admin dashboard
    pub async fn users(&self, admin: &Principal) -> ReportResult<Vec<UserListing>> {
        require_admin(admin)?;

        let users = or_default(
            "user listing",
            self.branch_timeout,
            self.users.list_by_role(Role::User),
            Vec::new(),
        )
        .await;

        Ok(users
            .into_iter()
            .map(|user| UserListing {
                id: user.id,
                telegram: user.telegram_username.clone().unwrap_or_default(),
                join_date: user.created_at.format(JOIN_DATE_FORMAT).to_string(),
                status: user.status,
                is_verified: user.is_verified,
                balance: user.balance,
                total_earnings: user.total_earnings,
                referral_code: user.referral_code,
                name: user.name,
                email: user.email,
            })
            .collect())
    }

    /// Administrator table for the admin dashboard
    pub async fn admins(&self, admin: &Principal) -> ReportResult<Vec<AdminListing>> {
        require_admin(admin)?;

        let admins = or_default(
            "admin listing",
            self.branch_timeout,
            self.users.list_by_role(Role::Admin),
            Vec::new(),
        )
        .await;

        Ok(admins
            .into_iter()
            .map(|user| AdminListing {
                id: user.id,
                join_date: user.created_at.format(JOIN_DATE_FORMAT).to_string(),
                status: user.status,
                is_verified: user.is_verified,
                name: user.name,
                email: user.email,
            })
            .collect())
    }

    /// Per-member referral totals
    pub async fn referral_summaries(&self, admin: &Principal) -> ReportResult<Vec<ReferrerSummary>> {
        require_admin(admin)?;

        let counts = or_default(
            "referral summary",
            self.branch_timeout,
            self.referrals.referrer_counts(),
            Vec::new(),
        )
        .await;

        Ok(counts
            .into_iter()
            .map(|row| ReferrerSummary {
                user_id: row.user.id,
                user: row.user.name,
                total: row.total,
                successful: row.successful,
                pending: row.pending,
                earned: row.user.total_earnings,
                status: if row.user.is_verified {
                    "Verified"
                } else {
                    "Unverified"
                }
                .to_string(),
            })
            .collect())
    }

    /// A member with their referrals and withdraw requests
    ///
    /// # Errors
    ///
    /// * `ReportError::UserNotFound` - Unknown user
    pub async fn user_dashboard(&self, user_id: UserId) -> ReportResult<UserDashboard> {
        let user: User = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(ReportError::UserNotFound(user_id))?;

        let (referrals, withdraw_requests) = tokio::join!(
            self.referrals.list_for_referrer(user_id),
            self.withdrawals.list_for_user(user_id),
        );
        let referrals = referrals?;
        let withdraw_requests = withdraw_requests?;

        let successful_referrals = referrals
            .iter()
            .filter(|r| r.referral.status == ReferralStatus::Completed)
            .count();
        let pending_referrals = referrals.len() - successful_referrals;

        Ok(UserDashboard {
            user,
            referrals,
            withdraw_requests,
            successful_referrals,
            pending_referrals,
        })
    }

    /// Whether storage answers a round trip
    pub async fn storage_healthy(&self) -> bool {
        with_timeout(self.branch_timeout, self.users.ping())
            .await
            .is_ok()
    }
}

fn require_admin(principal: &Principal) -> ReportResult<()> {
    if principal.is_admin() {
        Ok(())
    } else {
        Err(ReportError::Forbidden)
    }
}
