//! Retry with exponential backoff.
//!
//! The aggregator-read path is the one place the spec names a concrete
//! schedule: five attempts, `2000 * 2^attempt` milliseconds apart. Everything
//! else retries transient SDK throttling errors with the same shape but a
//! shorter ceiling, since those are already covered by the per-call
//! `Throttler`.

use std::future::Future;
use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;

/// Builds the aggregator-read retry schedule: up to 5 attempts, starting at
/// 2s and doubling each time (2s, 4s, 8s, 16s, 32s).
pub fn aggregator_read_schedule() -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: Duration::from_millis(2000),
        multiplier: 2.0,
        max_interval: Duration::from_millis(2000 * 2u64.pow(4)),
        max_elapsed_time: Some(Duration::from_millis(2000 * (2u64.pow(5) - 1))),
        ..ExponentialBackoff::default()
    }
}

/// Retries `operation` against `schedule` while `is_retryable` returns true
/// for the error, sleeping on `schedule`'s backoff between attempts.
/// Returns the first success or the last error once the schedule is
/// exhausted.
pub async fn retry_with_schedule<T, E, F, Fut, R>(
    mut schedule: ExponentialBackoff,
    mut operation: F,
    is_retryable: R,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    R: Fn(&E) -> bool,
{
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) => match schedule.next_backoff() {
                Some(delay) => tokio::time::sleep(delay).await,
                None => return Err(err),
            },
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_schedule(
            ExponentialBackoff {
                initial_interval: Duration::from_millis(1),
                max_interval: Duration::from_millis(2),
                max_elapsed_time: Some(Duration::from_millis(50)),
                ..ExponentialBackoff::default()
            },
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err("throttled")
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
        )
        .await;
        assert_eq!(result, Ok(2));
    }

    #[tokio::test]
    async fn non_retryable_error_returns_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<u32, &str> = retry_with_schedule(
            aggregator_read_schedule(),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal") }
            },
            |_| false,
        )
        .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
