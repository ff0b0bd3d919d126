//! Time budgets for storage calls.
//!
//! Read paths that fan out to several queries wrap each branch so a stalled
//! query degrades into its fallback instead of holding the whole response.

use super::errors::{StoreError, StoreResult};
use std::time::Duration;
use tokio::time::timeout;

/// Default timeout for single queries (5 seconds)
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default timeout for transactional units of work (10 seconds)
pub const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Execute a storage operation with a timeout
///
/// # Arguments
///
/// * `duration` - Timeout duration
/// * `future` - Storage operation to execute
///
/// # Returns
///
/// * `StoreResult<T>` - Operation result, or `StoreError::Timeout`
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(duration)),
    }
}

/// Execute a storage operation with the default query timeout
pub async fn with_default_timeout<F, T>(future: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    with_timeout(DEFAULT_QUERY_TIMEOUT, future).await
}
