//! Step execution with a fixed retry budget.
//!
//! The runner wraps each fallible step in a [`RetryStep`]. A failed attempt is
//! followed by a fixed delay (plus up to 250ms of jitter) and another attempt,
//! until `max_retries` extra attempts have been used. The final error is
//! returned unchanged.
//!
//! # Architecture
//!
//! - [`Step`]: one named unit of pipeline work
//! - [`RetryStep`]: decorator adding the retry loop to any [`Step`]

use crate::errors::StepError;
use rand::{Rng, rng};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// A named, fallible unit of pipeline work.
pub trait Step {
    /// Value produced by a successful run.
    type Output;

    /// Name used in logs and the run report.
    fn name(&self) -> &'static str;

    /// Execute the step once.
    async fn run(&self) -> Result<Self::Output, StepError>;
}

/// Wrapper that re-runs a failing [`Step`].
pub struct RetryStep<T> {
    inner: T,
    /// Attempts allowed after the first one.
    max_retries: usize,
    /// Pause between attempts, before jitter.
    delay: Duration,
}

impl<T: Step> RetryStep<T> {
    /// Wrap `inner`, allowing `max_retries` extra attempts spaced by `delay`.
    pub fn new(inner: T, max_retries: usize, delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            delay,
        }
    }
}

impl<T> fmt::Debug for RetryStep<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStep")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T: Step> Step for RetryStep<T> {
    type Output = T::Output;

    fn name(&self) -> &'static str {
        self.inner.name()
    }

    #[instrument(level = "info", skip_all, fields(step = self.inner.name()))]
    async fn run(&self) -> Result<Self::Output, StepError> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.run().await {
                Ok(out) => {
                    info!(
                        attempt = attempt + 1,
                        elapsed_ms_total = total_t0.elapsed().as_millis(),
                        "Step succeeded"
                    );
                    return Ok(out);
                }
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms_attempt = attempt_t0.elapsed().as_millis();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt,
                            elapsed_ms_total = total_t0.elapsed().as_millis(),
                            error = %e,
                            "Step exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = if self.delay.is_zero() {
                        self.delay
                    } else {
                        let jitter_ms: u64 = rng().random_range(0..=250);
                        self.delay + Duration::from_millis(jitter_ms)
                    };

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt,
                        ?delay,
                        error = %e,
                        "Step attempt failed; retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails until it has been called `succeed_on` times.
    struct Flaky {
        calls: AtomicUsize,
        succeed_on: usize,
    }

    impl Flaky {
        fn new(succeed_on: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                succeed_on,
            }
        }
    }

    impl Step for Flaky {
        type Output = usize;

        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn run(&self) -> Result<usize, StepError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n >= self.succeed_on {
                Ok(n)
            } else {
                Err(StepError::Command {
                    program: "flaky".to_string(),
                    args: String::new(),
                    code: Some(1),
                    stderr: format!("attempt {n} failed"),
                })
            }
        }
    }

    #[tokio::test]
    async fn test_succeeds_first_try() {
        let step = RetryStep::new(Flaky::new(1), 1, Duration::ZERO);
        assert_eq!(step.run().await.unwrap(), 1);
        assert_eq!(step.inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(step.name(), "flaky");
    }

    #[tokio::test]
    async fn test_recovers_within_budget() {
        let step = RetryStep::new(Flaky::new(2), 1, Duration::ZERO);
        assert_eq!(step.run().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_attempts_retries_plus_one() {
        let step = RetryStep::new(Flaky::new(usize::MAX), 1, Duration::ZERO);
        let err = step.run().await.unwrap_err();
        assert!(err.to_string().ends_with("attempt 2 failed"));
        assert_eq!(step.inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_zero_retries() {
        let step = RetryStep::new(Flaky::new(usize::MAX), 0, Duration::ZERO);
        assert!(step.run().await.is_err());
        assert_eq!(step.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_attempts() {
        let step = RetryStep::new(Flaky::new(2), 1, Duration::from_secs(300));
        let t0 = tokio::time::Instant::now();
        step.run().await.unwrap();
        assert!(t0.elapsed() >= Duration::from_secs(300));
    }
}
