//! Bounded exponential backoff for transient ledger failures.

use attestor_core::{LedgerError, RetryConfig};
use std::future::Future;
use std::time::Duration;

/// Run `op` until it succeeds or the retry budget is spent.
///
/// Only `LedgerError` outcomes reach this helper, and every member of that
/// taxonomy is transient by definition; fatal failures (reverts,
/// authorization) are classified by the caller before retrying. The total
/// attempt count is `max_retries + 1`.
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryConfig,
    operation: &str,
    mut op: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut delay = policy.initial_backoff;
    let mut attempt: u32 = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt > policy.max_retries {
                    tracing::error!(%err, operation, attempt, "retry budget exhausted");
                    return Err(err);
                }
                tracing::warn!(%err, operation, attempt, delay_ms = delay.as_millis() as u64,
                    "transient ledger failure, backing off");
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, policy);
            }
        }
    }
}

fn next_delay(current: Duration, policy: &RetryConfig) -> Duration {
    current.mul_f64(policy.backoff_multiplier).min(policy.max_backoff)
}
