//! Retry policy for upstream requests.
//!
//! Transient failures (non-success status, transport errors, undecodable
//! bodies) are retried with exponential backoff: 5 retries, starting at five
//! seconds and doubling. Rate-limit responses are not handled here; the
//! fetcher waits those out without touching the retry budget.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use backon::{ExponentialBuilder, Retryable};

/// Maximum retries for a single page request.
pub const MAX_FETCH_RETRIES: usize = 5;

/// First backoff delay.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(5);

/// Upper bound on a single backoff delay (5s doubled four times).
pub const MAX_BACKOFF: Duration = Duration::from_secs(80);

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub min_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Maximum number of retry attempts.
    pub max_retries: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            min_delay: INITIAL_BACKOFF,
            max_delay: MAX_BACKOFF,
            max_retries: MAX_FETCH_RETRIES,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn new(min_delay: Duration, max_delay: Duration, max_retries: usize) -> Self {
        Self {
            min_delay,
            max_delay,
            max_retries,
        }
    }

    /// Build a doubling backoff strategy from this configuration.
    #[must_use]
    pub fn into_backoff(self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.min_delay)
            .with_max_delay(self.max_delay)
            .with_factor(2.0)
            .with_max_times(self.max_retries)
    }
}

/// Run `operation`, retrying while `is_transient` says the error is worth
/// another attempt.
///
/// Errors for which `is_transient` returns false are returned immediately,
/// as is the last error once the budget is spent.
pub async fn retry_transient<T, E, F, Fut, IsTransient>(
    operation: F,
    config: &RetryConfig,
    is_transient: IsTransient,
    label: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    IsTransient: FnMut(&E) -> bool,
{
    let attempt = AtomicUsize::new(0);

    operation
        .retry(config.clone().into_backoff())
        .when(is_transient)
        .notify(|err, delay| {
            let n = attempt.fetch_add(1, Ordering::SeqCst) + 1;
            tracing::warn!(
                request = %label,
                attempt = n,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Request failed, retrying"
            );
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use backon::BackoffBuilder;
    use std::sync::Arc;

    #[test]
    fn default_backoff_starts_at_five_seconds_and_doubles() {
        let delays: Vec<Duration> = RetryConfig::default().into_backoff().build().collect();
        assert_eq!(
            delays,
            [5, 10, 20, 40, 80].map(Duration::from_secs).to_vec()
        );
    }

    #[test]
    fn custom_config_caps_delay() {
        let config = RetryConfig::new(Duration::from_secs(1), Duration::from_secs(3), 4);
        let delays: Vec<Duration> = config.into_backoff().build().collect();
        assert_eq!(delays, [1, 2, 3, 3].map(Duration::from_secs).to_vec());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors_until_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_capture = Arc::clone(&calls);

        let started = tokio::time::Instant::now();
        let result: Result<u32, String> = retry_transient(
            move || {
                let calls = Arc::clone(&calls_capture);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err("502".to_string())
                    } else {
                        Ok(7)
                    }
                }
            },
            &RetryConfig::default(),
            |_| true,
            "test",
        )
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 5s + 10s of backoff under paused time
        assert!(started.elapsed() >= Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_five_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_capture = Arc::clone(&calls);

        let result: Result<(), String> = retry_transient(
            move || {
                let calls = Arc::clone(&calls_capture);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("boom".to_string())
                }
            },
            &RetryConfig::default(),
            |_| true,
            "test",
        )
        .await;

        assert_eq!(result, Err("boom".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1 + MAX_FETCH_RETRIES);
    }

    #[tokio::test]
    async fn non_transient_errors_are_returned_immediately() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_capture = Arc::clone(&calls);

        let result: Result<(), String> = retry_transient(
            move || {
                let calls = Arc::clone(&calls_capture);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("fatal".to_string())
                }
            },
            &RetryConfig::default(),
            |_| false,
            "test",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
