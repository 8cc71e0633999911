use std::future::Future;
use std::time::Duration;

use common::logger::warn_if_slow;

use crate::error::MonitorError;

/// Runs one external call under its own timeout.
///
/// Calls that finish but take more than half the budget are reported as slow.
pub async fn within<F, T>(op: &'static str, after: Duration, fut: F) -> Result<T, MonitorError>
where
    F: Future<Output = T>,
{
    warn_if_slow(op, after / 2, tokio::time::timeout(after, fut))
        .await
        .map_err(|_| MonitorError::Timeout { op, after })
}
