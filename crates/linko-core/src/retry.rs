use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// The same delay after every failed attempt.
    Fixed,
    /// The delay doubles after every failed attempt.
    Exponential,
}

/// Bounded retry configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    max_attempts: u32,
    /// Delay after the first failed attempt.
    initial_delay: Duration,
    backoff: Backoff,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            backoff,
        }
    }

    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self::new(max_attempts, delay, Backoff::Fixed)
    }

    pub fn exponential(max_attempts: u32, initial_delay: Duration) -> Self {
        Self::new(max_attempts, initial_delay, Backoff::Exponential)
    }

    /// Write-behind persistence: 3 attempts, 200ms then 400ms.
    pub fn write_behind() -> Self {
        Self::exponential(3, Duration::from_millis(200))
    }

    /// Hit-count updates: 3 attempts, 200ms apart.
    pub fn hit_count() -> Self {
        Self::fixed(3, Duration::from_millis(200))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.initial_delay,
            Backoff::Exponential => {
                let factor = 1_u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                self.initial_delay.saturating_mul(factor)
            }
        }
    }
}

/// The last error of a retried operation.
#[derive(Debug, Clone)]
pub struct RetryError<E> {
    /// Attempts made before giving up.
    pub attempts: u32,
    pub source: E,
}

/// Runs `operation` until it succeeds, `should_retry` rejects the error, or
/// the policy's attempts are used up.
///
/// `operation` receives the 1-based attempt number.
pub async fn retry<T, E, F, Fut, P>(
    policy: &RetryPolicy,
    label: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: Display,
{
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                warn!(
                    operation = label,
                    attempt,
                    max_attempts,
                    error = %err,
                    "attempt failed"
                );

                if attempt >= max_attempts || !should_retry(&err) {
                    return Err(RetryError {
                        attempts: attempt,
                        source: err,
                    });
                }

                tokio::time::sleep(policy.delay_after(attempt)).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn exponential_delays_double() {
        let policy = RetryPolicy::write_behind();
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(2), Duration::from_millis(400));
        assert_eq!(policy.delay_after(3), Duration::from_millis(800));
    }

    #[test]
    fn fixed_delays_stay_constant() {
        let policy = RetryPolicy::hit_count();
        assert_eq!(policy.delay_after(1), Duration::from_millis(200));
        assert_eq!(policy.delay_after(5), Duration::from_millis(200));
    }

    #[test]
    fn at_least_one_attempt() {
        assert_eq!(RetryPolicy::fixed(0, Duration::ZERO).max_attempts(), 1);
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let policy = RetryPolicy::exponential(100, Duration::from_millis(200));
        assert_eq!(policy.delay_after(64), Duration::from_millis(200).saturating_mul(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::write_behind();

        let result = retry(
            &policy,
            "test",
            |attempt| {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if attempt < 3 {
                        Err("down")
                    } else {
                        Ok(attempt)
                    }
                }
            },
            |_| true,
        )
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::fixed(3, Duration::from_millis(200));
        let started = tokio::time::Instant::now();

        let err = retry(&policy, "test", |_| async { Err::<(), _>("down") }, |_| true)
            .await
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.source, "down");
        // Two sleeps between three attempts.
        assert_eq!(started.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_non_retryable_error() {
        let policy = RetryPolicy::write_behind();

        let err = retry(
            &policy,
            "test",
            |_| async { Err::<(), _>("conflict") },
            |e| *e != "conflict",
        )
        .await
        .unwrap_err();

        assert_eq!(err.attempts, 1);
    }
}
