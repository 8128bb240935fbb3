//! # Guarded hook dispatch.
//!
//! Routes an error to the [`ExceptionBehaviour`] hook matching its kind and
//! phase, catching whatever the hook itself throws:
//!
//! ```text
//! hook(error) ── Ok ──────────────────────────────► done
//!      └─ Err/panic ─► fallback(replacement) ── Ok ─► done
//!                              └─ Err/panic ─► tracing::error!(target: "channelvisor::failsafe") ─► discarded
//! ```

use std::panic::{catch_unwind, AssertUnwindSafe};

use anyhow::anyhow;

use crate::error::{panic_message, ErrorKind, ServiceError};
use crate::strategies::{ExceptionBehaviour, HookResult};

/// Target of the fixed diagnostic sink.
pub(crate) const FAILSAFE_TARGET: &str = "channelvisor::failsafe";

/// Runs a hook, turning a panic into an error.
fn run_hook<F: FnOnce() -> HookResult>(hook: F) -> HookResult {
    match catch_unwind(AssertUnwindSafe(hook)) {
        Ok(res) => res,
        Err(panic) => Err(anyhow!("hook panicked: {}", panic_message(panic.as_ref()))),
    }
}

/// Converts a hook failure into the error handed to the fallback hook.
fn replacement(err: anyhow::Error) -> ServiceError {
    match err.downcast::<ServiceError>() {
        Ok(service) => service,
        Err(other) => ServiceError::unexpected(format!("{other:#}")),
    }
}

/// Runs `primary`; on failure runs `fallback` once with the replacement error;
/// on a second failure writes to the diagnostic sink.
fn guarded<P, F>(phase: &'static str, primary: P, fallback: F)
where
    P: FnOnce() -> HookResult,
    F: FnOnce(&ServiceError) -> HookResult,
{
    let Err(first) = run_hook(primary) else {
        return;
    };
    let replacement = replacement(first);
    if let Err(again) = run_hook(|| fallback(&replacement)) {
        tracing::error!(
            target: FAILSAFE_TARGET,
            phase,
            error = %format!("{again:#}"),
            "exception occurred while handling an exception"
        );
    }
}

/// Dispatches an error raised by an operation call.
pub(crate) fn operation_failed(behaviour: &dyn ExceptionBehaviour, error: &ServiceError) {
    guarded(
        "invoke",
        || match error.kind() {
            ErrorKind::Fault => behaviour.on_fault(error),
            ErrorKind::Communication => behaviour.on_communication(error),
            ErrorKind::Timeout => behaviour.on_timeout(error),
            ErrorKind::Unexpected => behaviour.on_unexpected(error),
        },
        |replacement| behaviour.on_unexpected(replacement),
    );
}

/// Dispatches an error raised by `close()`.
pub(crate) fn close_failed(behaviour: &dyn ExceptionBehaviour, error: &ServiceError) {
    guarded(
        "close",
        || match error.kind() {
            ErrorKind::Communication => behaviour.on_close_communication(error),
            ErrorKind::Timeout => behaviour.on_close_timeout(error),
            ErrorKind::Fault | ErrorKind::Unexpected => behaviour.on_close_unexpected(error),
        },
        |replacement| behaviour.on_close_unexpected(replacement),
    );
}

/// Dispatches an error raised by `abort()`.
pub(crate) fn abort_failed(behaviour: &dyn ExceptionBehaviour, error: &ServiceError) {
    guarded(
        "abort",
        || behaviour.on_abort(error),
        |replacement| behaviour.on_abort(replacement),
    );
}

/// Dispatches the error of a failed attempt made under a retry policy.
pub(crate) fn attempt_failed(behaviour: &dyn ExceptionBehaviour, error: &ServiceError, attempt: u32) {
    guarded(
        "retry_attempt",
        || behaviour.on_retry_attempt(error, attempt),
        |replacement| behaviour.on_unexpected(replacement),
    );
}

/// Dispatches a failure of the drop-time teardown.
pub(crate) fn destructor_failed(behaviour: &dyn ExceptionBehaviour, error: &ServiceError) {
    if let Err(again) = run_hook(|| behaviour.on_destructor(error)) {
        tracing::error!(
            target: FAILSAFE_TARGET,
            phase = "destructor",
            error = %format!("{again:#}"),
            "exception occurred while handling an exception"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingBehaviour;

    struct Throwing {
        inner: RecordingBehaviour,
    }

    impl ExceptionBehaviour for Throwing {
        fn on_communication(&self, error: &ServiceError) -> HookResult {
            self.inner.on_communication(error)?;
            Err(ServiceError::timeout("replacement").into())
        }

        fn on_unexpected(&self, error: &ServiceError) -> HookResult {
            self.inner.on_unexpected(error)?;
            panic!("fallback panicked too");
        }

        fn on_close_timeout(&self, error: &ServiceError) -> HookResult {
            self.inner.on_close_timeout(error)?;
            anyhow::bail!("close hook broke")
        }

        fn on_close_unexpected(&self, error: &ServiceError) -> HookResult {
            self.inner.on_close_unexpected(error)
        }
    }

    #[test]
    fn each_kind_reaches_its_own_hook() {
        let rec = RecordingBehaviour::default();
        operation_failed(&rec, &ServiceError::fault("nope"));
        operation_failed(&rec, &ServiceError::communication("reset"));
        operation_failed(&rec, &ServiceError::timeout("slow"));
        operation_failed(&rec, &ServiceError::unexpected("odd"));

        assert_eq!(
            rec.calls(),
            vec!["fault", "communication", "timeout", "unexpected"]
        );
    }

    #[test]
    fn failing_hook_is_redirected_once_then_discarded() {
        let throwing = Throwing {
            inner: RecordingBehaviour::default(),
        };
        operation_failed(&throwing, &ServiceError::communication("reset"));

        assert_eq!(throwing.inner.calls(), vec!["communication", "unexpected"]);
        assert!(matches!(
            throwing.inner.errors().last(),
            Some(ServiceError::Timeout { .. })
        ));
    }

    #[test]
    fn failing_close_hook_falls_back_to_close_unexpected() {
        let throwing = Throwing {
            inner: RecordingBehaviour::default(),
        };
        close_failed(&throwing, &ServiceError::timeout("close took too long"));

        assert_eq!(throwing.inner.calls(), vec!["close_timeout", "close_unexpected"]);
        assert!(matches!(
            throwing.inner.errors().last(),
            Some(ServiceError::Unexpected { message }) if message.contains("close hook broke")
        ));
    }

    #[test]
    fn retry_attempt_hook_receives_attempt_number() {
        let rec = RecordingBehaviour::default();
        attempt_failed(&rec, &ServiceError::communication("reset"), 3);
        assert_eq!(rec.attempts(), vec![3]);
    }
}
