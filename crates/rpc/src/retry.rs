//! Exponential backoff for transport failures

use gasless_primitives::{AccountError, AccountResult, RetryPolicy};
use std::future::Future;
use tracing::{trace, warn};

/// Runs `f` until it succeeds, fails with a non-retryable error or the attempt ceiling is reached
///
/// # Arguments
/// * `policy` - Attempt ceiling and backoff schedule
/// * `operation` - Name of the operation (used in logs)
/// * `f` - Produces one attempt
///
/// # Returns
/// * `AccountResult<T>` - The first success, the first non-retryable error, or
///   `NetworkUnavailable` once `policy.max_attempts` attempts failed
pub async fn with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut f: F,
) -> AccountResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AccountResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        trace!("{operation}: attempt {attempt}/{max_attempts}");
        match f().await {
            Ok(res) => return Ok(res),
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                let delay = policy.backoff(attempt);
                warn!(
                    "{operation} failed (attempt {attempt}/{max_attempts}), retrying in {delay:?}: {err}"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(AccountError::NetworkUnavailable(msg)) => {
                return Err(AccountError::NetworkUnavailable(format!(
                    "{operation} failed after {attempt} attempt(s): {msg}"
                )))
            }
            Err(err) => return Err(err),
        }
    }
}
