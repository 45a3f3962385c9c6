//! Retry utilities for the upstream birthday query.
//!
//! Transient failures (429, 5xx, network errors) are retried with exponential
//! backoff and jitter, or after the server's `Retry-After` when a 429 carries
//! one. Everything else is returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Delay cap for a single backoff sleep.
const MAX_DELAY_SECS: u64 = 60;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`ScraperError::RateLimited`]: HTTP 429.
/// - [`ScraperError::Http`]: network-level failure (connection reset, timeout).
/// - [`ScraperError::UnexpectedStatus`] with a 5xx status.
///
/// Non-retriable: 4xx statuses (expired session, bad request), invalid URLs and
/// invalid months.
fn is_retriable(err: &ScraperError) -> bool {
    match err {
        ScraperError::RateLimited { .. } | ScraperError::Http(_) => true,
        ScraperError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        ScraperError::InvalidApiUrl { .. } | ScraperError::InvalidMonth(_) => false,
    }
}

/// Executes `operation` with up to `max_retries` additional attempts on
/// transient errors.
///
/// See [`retry_delay`] for the wait between attempts.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = retry_delay(&err, attempt, backoff_base_secs);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient upstream error, retrying after backoff"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Wait before retry `attempt` (1-based).
///
/// A 429 with `Retry-After` waits what the server asked for. Otherwise the
/// wait is `backoff_base_secs * 2^(attempt-1)` seconds scaled by a random
/// factor in `0.75..1.25`. Both are capped at 60 s.
fn retry_delay(err: &ScraperError, attempt: u32, backoff_base_secs: u64) -> Duration {
    if let ScraperError::RateLimited {
        retry_after_secs: Some(secs),
    } = err
    {
        return Duration::from_secs((*secs).min(MAX_DELAY_SECS));
    }
    let computed = backoff_base_secs.saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
    let capped_ms = computed.min(MAX_DELAY_SECS).saturating_mul(1000);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let delay_ms = (capped_ms as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    Duration::from_millis(delay_ms.min(MAX_DELAY_SECS * 1000))
}
