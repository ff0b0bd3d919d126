//! Read-only views: admin statistics and listings, member dashboards.

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{ReportError, ReportResult};
pub use manager::{RECENT_ACTIVITY_LIMIT, ReportManager};
pub use models::{
    AdminListing, AdminStats, RecentActivity, ReferrerCounts, ReferrerSummary, UserDashboard,
    UserListing,
};
