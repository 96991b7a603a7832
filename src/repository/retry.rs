//! Bounded retry with jittered backoff for transient repository failures.
//!
//! Only failures marked retryable (`Unavailable`) are retried, and only at
//! this boundary. Business-layer failures pass through untouched.

use crate::error::Result;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(50);

pub async fn with_retry<T, F, Fut>(operation: &str, f: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match f().await {
            Err(err) if err.code.is_retryable() && attempt < MAX_ATTEMPTS => {
                let backoff = backoff_for(attempt);
                warn!(
                    operation,
                    attempt,
                    backoff_ms = backoff.as_millis() as u64,
                    "transient repository failure, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
            other => return other,
        }
    }
}

/// Exponential backoff with up to 50% random jitter.
fn backoff_for(attempt: u32) -> Duration {
    let base = BASE_BACKOFF * 2u32.saturating_pow(attempt - 1);
    let jitter = rand::thread_rng().gen_range(0..=base.as_millis() as u64 / 2);
    base + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_transient_failures_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_retry("test_op", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ApiError::unavailable("flaky"))
            } else {
                Ok(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::unavailable("down"))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn business_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = with_retry("test_op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ApiError::invalid_credentials())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
