//! # Fixed-interval retry.
//!
//! [`FixedIntervalRetry`] retries transient errors up to `retries` times,
//! sleeping `interval` between attempts. It blocks the calling thread, like
//! the call it wraps.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use channelvisor::{FixedIntervalRetry, RetryPolicy, ServiceError};
//!
//! let policy = FixedIntervalRetry::new(2, Duration::ZERO);
//!
//! let mut tries = 0;
//! let res = policy.execute(&mut || {
//!     tries += 1;
//!     Err(ServiceError::communication("reset"))
//! });
//!
//! assert!(res.is_err());
//! assert_eq!(tries, 3); // first try + 2 retries
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ServiceError;
use crate::retry::policy::{is_transient, RetryPolicy};

/// Decides whether an error is worth another attempt.
pub type TransientPredicate = Arc<dyn Fn(&ServiceError) -> bool + Send + Sync>;

/// Retries transient errors a fixed number of times with a constant delay.
#[derive(Clone)]
pub struct FixedIntervalRetry {
    retries: u32,
    interval: Duration,
    transient: TransientPredicate,
}

impl FixedIntervalRetry {
    /// Creates a policy using [`is_transient`].
    pub fn new(retries: u32, interval: Duration) -> Self {
        Self {
            retries,
            interval,
            transient: Arc::new(is_transient),
        }
    }

    /// Replaces the transient-error predicate.
    pub fn with_transient<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&ServiceError) -> bool + Send + Sync + 'static,
    {
        self.transient = Arc::new(predicate);
        self
    }

    /// Maximum number of retries after the first attempt.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay between attempts.
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl fmt::Debug for FixedIntervalRetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedIntervalRetry")
            .field("retries", &self.retries)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

impl RetryPolicy for FixedIntervalRetry {
    fn execute(
        &self,
        attempt: &mut dyn FnMut() -> Result<(), ServiceError>,
    ) -> Result<(), ServiceError> {
        let mut retried = 0;
        loop {
            match attempt() {
                Ok(()) => return Ok(()),
                Err(err) if retried < self.retries && (self.transient)(&err) => {
                    retried += 1;
                    tracing::debug!(
                        retry = retried,
                        of = self.retries,
                        delay_ms = self.interval.as_millis() as u64,
                        error = err.as_label(),
                        "retrying after transient error"
                    );
                    if !self.interval.is_zero() {
                        std::thread::sleep(self.interval);
                    }
                }
                Err(err) => return Err(err),
            }
        }
    }
}
