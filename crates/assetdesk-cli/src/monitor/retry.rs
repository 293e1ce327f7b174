//! Retry with exponential backoff for dashboard requests

use anyhow::Result;
use assetdesk_types::RetryPolicy;
use std::future::Future;
use tracing::warn;

#[derive(Default)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    #[cfg(test)]
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Runs `operation` until it succeeds, fails with an authentication
    /// error, or the retry budget is spent. Returns the last error.
    pub async fn execute<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut failures = 0u32;

        loop {
            let err = match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => e,
            };
            failures += 1;

            let message = format!("{:#}", err);
            if !self.policy.should_retry(failures, &message) {
                return Err(err);
            }

            let delay = self.policy.delay(failures - 1);
            warn!(
                "Request failed (attempt {}/{}), retrying in {:?}: {}",
                failures,
                self.policy.max_retries + 1,
                delay,
                message
            );
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    fn fast() -> RetryExecutor {
        RetryExecutor::new(RetryPolicy {
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(5),
            ..RetryPolicy::default()
        })
    }

    #[tokio::test]
    async fn test_generic_failure_retried_three_times() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = fast()
            .execute(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("Fetching metrics failed: Upstream error (502 Bad Gateway)")
            })
            .await;

        assert!(result.is_err());
        // One initial attempt plus three retries
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_authentication_failures_not_retried() {
        for message in [
            "Authentication failed: Incorrect user name or password",
            "Fetching metrics failed: token expired (401 Unauthorized)",
        ] {
            let calls = AtomicU32::new(0);
            let result: Result<()> = fast()
                .execute(|| async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow::anyhow!(message.to_string()))
                })
                .await;

            assert!(result.is_err());
            assert_eq!(calls.load(Ordering::SeqCst), 1, "{}", message);
        }
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let value = fast()
            .execute(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    anyhow::bail!("connection reset");
                }
                Ok(42)
            })
            .await
            .unwrap();

        assert_eq!(value, 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
