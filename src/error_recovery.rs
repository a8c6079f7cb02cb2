// src/error_recovery.rs
//! Retry with exponential backoff for store operations.

use crate::constants::{RETRY_INITIAL_DELAY_MS, RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY_MS};
use crate::error::AppError;
use std::time::Duration;

/// How many times, and how patiently, a failed request is repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            initial_delay: Duration::from_millis(RETRY_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(RETRY_MAX_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that tries once and never waits.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }
}

/// Retries an async operation with exponential backoff.
///
/// Only errors reporting a transient condition are retried; anything else
/// is returned on the spot.
pub async fn retry_with_backoff<F, T, Fut>(
    mut operation: F,
    policy: RetryPolicy,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, AppError>>,
{
    let mut delay = policy.initial_delay;
    let mut last_error = None;

    for attempt in 1..=policy.max_attempts {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt < policy.max_attempts {
                    log::warn!(
                        "Attempt {} failed ({}), retrying after {:?}",
                        attempt,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;

                    // Exponential backoff with cap
                    delay = std::cmp::min(delay * 2, policy.max_delay);
                }
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| AppError::InternalError {
        message: "Retry failed with no error".to_string(),
        source: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NotionErrorCode, StoreOperation};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
        }
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result = retry_with_backoff(
            move || async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::remote(
                        StoreOperation::Retrieve,
                        "x",
                        Some(NotionErrorCode::RateLimited),
                        "slow down",
                    ))
                } else {
                    Ok(7)
                }
            },
            fast_policy(3),
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failures_are_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;
        let result: Result<(), _> = retry_with_backoff(
            move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(AppError::remote(
                    StoreOperation::Create,
                    "x",
                    Some(NotionErrorCode::ValidationFailed),
                    "bad body",
                ))
            },
            fast_policy(3),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
