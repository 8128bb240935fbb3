//! # Retry policy contract.
//!
//! A [`RetryPolicy`] receives the whole call-and-classify cycle as one attempt
//! closure and may run it any number of times. The error of the last attempt
//! is what the policy returns.
//!
//! The attempt closure returns `Result<(), ServiceError>`; the value of a
//! successful attempt is kept by the caller, so one policy object serves calls
//! of every return type.
//!
//! Plain closures are policies too:
//! ```
//! use channelvisor::{RetryPolicy, ServiceError};
//!
//! let twice = |attempt: &mut dyn FnMut() -> Result<(), ServiceError>| {
//!     attempt().or_else(|_| attempt())
//! };
//!
//! let mut tries = 0;
//! let res = twice.execute(&mut || {
//!     tries += 1;
//!     if tries == 1 { Err(ServiceError::communication("reset")) } else { Ok(()) }
//! });
//! assert!(res.is_ok());
//! ```

use crate::error::{ErrorKind, ServiceError};

/// Runs an attempt closure one or more times.
pub trait RetryPolicy: Send + Sync + 'static {
    /// Runs `attempt` until the policy is satisfied; returns the last outcome.
    fn execute(
        &self,
        attempt: &mut dyn FnMut() -> Result<(), ServiceError>,
    ) -> Result<(), ServiceError>;
}

impl<F> RetryPolicy for F
where
    F: Fn(&mut dyn FnMut() -> Result<(), ServiceError>) -> Result<(), ServiceError>
        + Send
        + Sync
        + 'static,
{
    fn execute(
        &self,
        attempt: &mut dyn FnMut() -> Result<(), ServiceError>,
    ) -> Result<(), ServiceError> {
        self(attempt)
    }
}

/// Default transient-error predicate.
///
/// Everything is worth retrying except faults reported by the peer and
/// cooperative cancellation.
pub fn is_transient(error: &ServiceError) -> bool {
    match error.root_cause() {
        ServiceError::Canceled => false,
        other => other.kind() != ErrorKind::Fault,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faults_and_cancellation_are_final() {
        assert!(!is_transient(&ServiceError::fault("bad input")));
        assert!(!is_transient(&ServiceError::wrap(
            "call",
            ServiceError::Canceled
        )));
        assert!(is_transient(&ServiceError::communication("reset")));
        assert!(is_transient(&ServiceError::timeout("5s")));
        assert!(is_transient(&ServiceError::ChannelDisposed));
        assert!(is_transient(&ServiceError::unexpected("odd")));
    }
}
