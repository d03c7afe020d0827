// Retry logic with exponential backoff for transient backend failures

use std::time::Duration;
use tokio::time::sleep;

use super::types::ProviderError;

const BASE_DELAY_MS: u64 = 1000;

/// How many times to try a request before giving up
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: Duration::from_millis(BASE_DELAY_MS),
        }
    }

    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self::new(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Run `f`, retrying transient failures with exponential backoff.
///
/// Permanent failures (bad status, undecodable body) are returned at once.
pub async fn with_retry<F, Fut, T>(policy: RetryPolicy, f: F) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt + 1 < policy.max_attempts => {
                let delay = policy.base_delay * 2u32.pow(attempt);
                tracing::warn!(
                    "Request failed (attempt {}/{}): {}. Retrying in {:?}",
                    attempt + 1,
                    policy.max_attempts,
                    e,
                    delay
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
