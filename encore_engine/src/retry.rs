//! Bounded retry with exponential backoff.
//!
//! The refund flow is the only place in the engine that intentionally sleeps. The policy lives here as a standalone
//! value so the backoff schedule can be tested with a fake sleeper and the saga logic stays free of timing concerns.

use std::{fmt::Display, future::Future, time::Duration};

use log::*;

/// Abstraction over the delay between retry attempts. Production code uses [`TokioSleeper`]; tests substitute a
/// recording fake so no test actually waits.
#[allow(async_fn_in_trait)]
pub trait Sleeper {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// The outcome of a retry loop whose budget ran out.
#[derive(Debug, Clone)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: E,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self { max_attempts, base_delay }
    }

    /// The production refund policy: 3 attempts with doubling delays starting at 1s.
    pub const fn refund_default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// The delay to wait before the given attempt (attempts are 1-based; the first attempt has no delay).
    pub fn delay_before(&self, attempt: u32) -> Duration {
        debug_assert!(attempt >= 2);
        self.base_delay * 2u32.saturating_pow(attempt - 2)
    }

    /// Runs `op` until it succeeds or the attempt budget is exhausted. The closure receives the 1-based attempt
    /// number. Errors from intermediate attempts are logged and discarded; only the last error is returned.
    pub async fn run<T, E, S, F, Fut>(&self, sleeper: &S, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        S: Sleeper,
        E: Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut last_error = None;
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                let delay = self.delay_before(attempt);
                debug!("⏳️ Waiting {delay:?} before attempt {attempt}/{}", self.max_attempts);
                sleeper.sleep(delay).await;
            }
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!("⏳️ Attempt {attempt}/{} failed: {e}", self.max_attempts);
                    last_error = Some(e);
                },
            }
        }
        // max_attempts is at least 1, so last_error is always populated here
        let last_error = last_error.expect("retry loop ran zero attempts");
        Err(RetryExhausted { attempts: self.max_attempts, last_error })
    }
}

#[cfg(test)]
mod test {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    };

    use super::*;

    #[derive(Default)]
    struct RecordingSleeper {
        delays: Mutex<Vec<Duration>>,
    }

    impl Sleeper for &RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.delays.lock().unwrap().push(duration);
        }
    }

    #[tokio::test]
    async fn backoff_doubles_from_the_base_delay() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::new(4, Duration::from_secs(1));
        let result: Result<(), _> = policy.run(&&sleeper, |_| async { Err::<(), _>("nope") }).await;
        let err = result.unwrap_err();
        assert_eq!(err.attempts, 4);
        assert_eq!(err.last_error, "nope");
        let delays = sleeper.delays.lock().unwrap().clone();
        assert_eq!(delays, vec![Duration::from_secs(1), Duration::from_secs(2), Duration::from_secs(4)]);
    }

    #[tokio::test]
    async fn success_short_circuits_remaining_attempts() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::refund_default();
        let calls = AtomicU32::new(0);
        let result = policy
            .run(&&sleeper, |attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 2 {
                        Err("transient")
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(sleeper.delays.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn first_attempt_has_no_delay() {
        let sleeper = RecordingSleeper::default();
        let policy = RetryPolicy::refund_default();
        let result = policy.run(&&sleeper, |_| async { Ok::<_, String>(42) }).await;
        assert_eq!(result.unwrap(), 42);
        assert!(sleeper.delays.lock().unwrap().is_empty());
    }
}
