//! # Built-in behaviours.
//!
//! - [`NullBehaviour`]: ignores everything.
//! - [`StandardErrorBehaviour`]: writes each error's description to stderr.
//! - [`StandardOutBehaviour`]: same, to stdout.
//!
//! Output lines look like:
//! ```text
//! [invoke:communication] communication failure: connection reset
//! [close:timeout] timed out: no reply within 5s
//! retry attempt 2: communication failure: connection reset
//! ```
//!
//! A failed write is returned as the hook's error, so it goes through the usual
//! failsafe redirection.

use std::io::{self, Write};
use std::sync::{Arc, LazyLock};

use crate::error::ServiceError;
use crate::strategies::{ExceptionBehaviour, HookResult};

/// Behaviour that ignores every hook.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBehaviour;

impl NullBehaviour {
    /// Returns the shared instance.
    pub fn shared() -> Arc<dyn ExceptionBehaviour> {
        static SHARED: LazyLock<Arc<NullBehaviour>> = LazyLock::new(|| Arc::new(NullBehaviour));
        SHARED.clone()
    }
}

impl ExceptionBehaviour for NullBehaviour {}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn write_line(self, line: &str) -> HookResult {
        match self {
            Stream::Stdout => writeln!(io::stdout().lock(), "{line}")?,
            Stream::Stderr => writeln!(io::stderr().lock(), "{line}")?,
        }
        Ok(())
    }
}

fn describe(phase: &str, error: &ServiceError) -> String {
    format!("[{phase}:{}] {error}", error.kind())
}

fn describe_attempt(error: &ServiceError, attempt: u32) -> String {
    format!("retry attempt {attempt}: {error}")
}

/// Implements every hook by writing a description line to `$stream`.
macro_rules! stream_behaviour {
    ($ty:ident, $stream:expr) => {
        impl ExceptionBehaviour for $ty {
            fn on_fault(&self, error: &ServiceError) -> HookResult {
                $stream.write_line(&describe("invoke", error))
            }

            fn on_communication(&self, error: &ServiceError) -> HookResult {
                $stream.write_line(&describe("invoke", error))
            }

            fn on_timeout(&self, error: &ServiceError) -> HookResult {
                $stream.write_line(&describe("invoke", error))
            }

            fn on_unexpected(&self, error: &ServiceError) -> HookResult {
                $stream.write_line(&describe("invoke", error))
            }

            fn on_close_communication(&self, error: &ServiceError) -> HookResult {
                $stream.write_line(&describe("close", error))
            }

            fn on_close_timeout(&self, error: &ServiceError) -> HookResult {
                $stream.write_line(&describe("close", error))
            }

            fn on_close_unexpected(&self, error: &ServiceError) -> HookResult {
                $stream.write_line(&describe("close", error))
            }

            fn on_abort(&self, error: &ServiceError) -> HookResult {
                $stream.write_line(&describe("abort", error))
            }

            fn on_retry_attempt(&self, error: &ServiceError, attempt: u32) -> HookResult {
                $stream.write_line(&describe_attempt(error, attempt))
            }

            fn on_destructor(&self, error: &ServiceError) -> HookResult {
                $stream.write_line(&describe("drop", error))
            }
        }
    };
}

/// Behaviour that writes every error to standard error.
///
/// This is the initial process-wide default of
/// [`ConsumerFactory`](crate::ConsumerFactory).
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardErrorBehaviour;

impl StandardErrorBehaviour {
    /// Returns the shared instance.
    pub fn shared() -> Arc<dyn ExceptionBehaviour> {
        static SHARED: LazyLock<Arc<StandardErrorBehaviour>> =
            LazyLock::new(|| Arc::new(StandardErrorBehaviour));
        SHARED.clone()
    }
}

stream_behaviour!(StandardErrorBehaviour, Stream::Stderr);

/// Behaviour that writes every error to standard output.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardOutBehaviour;

impl StandardOutBehaviour {
    /// Returns the shared instance.
    pub fn shared() -> Arc<dyn ExceptionBehaviour> {
        static SHARED: LazyLock<Arc<StandardOutBehaviour>> =
            LazyLock::new(|| Arc::new(StandardOutBehaviour));
        SHARED.clone()
    }
}

stream_behaviour!(StandardOutBehaviour, Stream::Stdout);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_carry_phase_and_kind() {
        let line = describe("close", &ServiceError::timeout("5s"));
        assert_eq!(line, "[close:timeout] timed out: 5s");
    }

    #[test]
    fn retry_lines_carry_the_attempt() {
        let line = describe_attempt(&ServiceError::communication("reset"), 2);
        assert_eq!(line, "retry attempt 2: communication failure: reset");
    }

    #[test]
    fn shared_instances_are_reused() {
        let a = StandardErrorBehaviour::shared();
        let b = StandardErrorBehaviour::shared();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(NullBehaviour.on_abort(&ServiceError::Canceled).is_ok());
    }
}
