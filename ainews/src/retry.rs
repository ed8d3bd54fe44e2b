use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Fixed-count, fixed-delay retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one, never below 1
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Run `op` until it succeeds or the attempt budget is spent.
    /// `op` receives the 1-based attempt number.
    pub async fn run<T, F, Fut>(&self, label: &str, op: F) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_classified(label, op, |_| true).await
    }

    /// Like [`RetryPolicy::run`], but stops early when `is_retryable`
    /// rejects the error.
    pub async fn run_classified<T, F, Fut, C>(&self, label: &str, mut op: F, is_retryable: C) -> Result<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T>>,
        C: Fn(&anyhow::Error) -> bool,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= self.max_attempts || !is_retryable(&e) {
                        return Err(e.context(format!("{} failed after {} attempt(s)", label, attempt)));
                    }
                    warn!(
                        "{} failed (attempt {}/{}): {:#}, retrying in {:?}",
                        label, attempt, self.max_attempts, e, self.delay
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = quick(3)
            .run("flaky", |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        anyhow::bail!("boom {}", attempt);
                    }
                    Ok(attempt)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = quick(3)
            .run("always failing", |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { anyhow::bail!("down") }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(err.to_string().contains("after 3 attempt(s)"));
    }

    #[tokio::test]
    async fn classifier_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = quick(5)
            .run_classified(
                "permanent",
                |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { anyhow::bail!("404 not found") }
                },
                |e| !e.to_string().contains("404"),
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn zero_attempts_is_bumped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
    }
}
