//! # Exception behaviour hooks.
//!
//! [`ExceptionBehaviour`] is the extension point invoked whenever an error
//! crosses the channel boundary. There is one hook per (error kind × lifecycle
//! phase):
//!
//! | phase            | hooks                                                             |
//! |------------------|-------------------------------------------------------------------|
//! | operation invoke | `on_fault`, `on_communication`, `on_timeout`, `on_unexpected`     |
//! | close            | `on_close_communication`, `on_close_timeout`, `on_close_unexpected` |
//! | abort            | `on_abort`                                                        |
//! | retry attempt    | `on_retry_attempt`                                                |
//! | drop/finalizer   | `on_destructor`                                                   |
//!
//! There is no close-phase fault hook: a peer cannot report a fault while the
//! channel is closing.
//!
//! ## Failure of a hook
//! A hook may fail by returning `Err` or by panicking. The failure is redirected
//! once to a fallback hook (`on_unexpected` for invoke and retry, `on_close_unexpected`
//! for close, `on_abort` for abort); if the fallback fails too, the failure is
//! logged on the `channelvisor::failsafe` target and discarded. Hooks can never
//! break a teardown sequence.
//!
//! ## Example
//! ```
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use channelvisor::{ExceptionBehaviour, HookResult, ServiceError};
//!
//! #[derive(Default)]
//! struct RetryCounter(AtomicU32);
//!
//! impl ExceptionBehaviour for RetryCounter {
//!     fn on_retry_attempt(&self, _error: &ServiceError, attempt: u32) -> HookResult {
//!         self.0.store(attempt, Ordering::SeqCst);
//!         Ok(())
//!     }
//! }
//!
//! let counter = RetryCounter::default();
//! counter.on_retry_attempt(&ServiceError::communication("reset"), 2).unwrap();
//! assert_eq!(counter.0.load(Ordering::SeqCst), 2);
//! ```

use crate::error::ServiceError;

/// Result of a behaviour hook. `Err` is treated like a thrown replacement error.
pub type HookResult = anyhow::Result<()>;

/// Pluggable set of callbacks invoked at defined error points.
///
/// Every hook defaults to a no-op, so implementations override only what they need.
/// Implementations must be stateless or internally synchronized: one instance may be
/// shared by many consumers.
pub trait ExceptionBehaviour: Send + Sync + 'static {
    /// The peer reported a fault while an operation was invoked.
    fn on_fault(&self, error: &ServiceError) -> HookResult {
        let _ = error;
        Ok(())
    }

    /// A transport failure occurred while an operation was invoked.
    fn on_communication(&self, error: &ServiceError) -> HookResult {
        let _ = error;
        Ok(())
    }

    /// An operation timed out.
    fn on_timeout(&self, error: &ServiceError) -> HookResult {
        let _ = error;
        Ok(())
    }

    /// An uncategorized error occurred while an operation was invoked,
    /// or another invoke-phase hook failed.
    fn on_unexpected(&self, error: &ServiceError) -> HookResult {
        let _ = error;
        Ok(())
    }

    /// `close()` failed with a transport error.
    fn on_close_communication(&self, error: &ServiceError) -> HookResult {
        let _ = error;
        Ok(())
    }

    /// `close()` timed out.
    fn on_close_timeout(&self, error: &ServiceError) -> HookResult {
        let _ = error;
        Ok(())
    }

    /// `close()` failed with an uncategorized error, or another close hook failed.
    fn on_close_unexpected(&self, error: &ServiceError) -> HookResult {
        let _ = error;
        Ok(())
    }

    /// `abort()` failed. Abort failures are terminal; nothing else is attempted.
    fn on_abort(&self, error: &ServiceError) -> HookResult {
        let _ = error;
        Ok(())
    }

    /// An attempt made under a retry policy failed.
    ///
    /// `attempt` is 1 for the first try, not for the first retry.
    fn on_retry_attempt(&self, error: &ServiceError, attempt: u32) -> HookResult {
        let _ = (error, attempt);
        Ok(())
    }

    /// Teardown performed while dropping a consumer failed.
    fn on_destructor(&self, error: &ServiceError) -> HookResult {
        let _ = error;
        Ok(())
    }
}
