//! Shared fakes for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::channel::{ChannelState, RemoteChannel};
use crate::error::ServiceError;
use crate::events::{ChannelEvent, ChannelEventKind};
use crate::observers::{Observe, ObserverRegistry};
use crate::strategies::{ExceptionBehaviour, HookResult};

/// In-memory channel with scripted close/abort outcomes.
#[derive(Default)]
pub(crate) struct FakeChannel {
    state: Mutex<Option<ChannelState>>,
    close_error: Mutex<Option<ServiceError>>,
    abort_error: Mutex<Option<ServiceError>>,
    faulted: ObserverRegistry<ChannelState>,
    close_calls: AtomicUsize,
    abort_calls: AtomicUsize,
    add_calls: AtomicUsize,
}

impl FakeChannel {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn set_state(&self, state: ChannelState) {
        *self.state.lock().unwrap() = Some(state);
    }

    /// Switches to Faulted and notifies listeners, like a broken transport.
    pub(crate) fn fault(&self) {
        self.set_state(ChannelState::Faulted);
        self.faulted.publish(&ChannelState::Faulted);
    }

    pub(crate) fn fail_close_with(&self, err: ServiceError) {
        *self.close_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn fail_abort_with(&self, err: ServiceError) {
        *self.abort_error.lock().unwrap() = Some(err);
    }

    pub(crate) fn add(&self, a: i32, b: i32) -> Result<i32, ServiceError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        Ok(a + b)
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn abort_calls(&self) -> usize {
        self.abort_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }
}

impl RemoteChannel for FakeChannel {
    fn state(&self) -> ChannelState {
        self.state.lock().unwrap().unwrap_or(ChannelState::Opened)
    }

    fn close(&self) -> Result<(), ServiceError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.close_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.set_state(ChannelState::Closed);
        Ok(())
    }

    fn abort(&self) -> Result<(), ServiceError> {
        self.abort_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.abort_error.lock().unwrap().clone() {
            return Err(err);
        }
        self.set_state(ChannelState::Closed);
        Ok(())
    }

    fn faulted(&self) -> &ObserverRegistry<ChannelState> {
        &self.faulted
    }
}

/// Records every hook invocation by name.
#[derive(Default)]
pub(crate) struct RecordingBehaviour {
    calls: Mutex<Vec<&'static str>>,
    errors: Mutex<Vec<ServiceError>>,
    attempts: Mutex<Vec<u32>>,
}

impl RecordingBehaviour {
    fn record(&self, hook: &'static str, error: &ServiceError) -> HookResult {
        self.calls.lock().unwrap().push(hook);
        self.errors.lock().unwrap().push(error.clone());
        Ok(())
    }

    pub(crate) fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn errors(&self) -> Vec<ServiceError> {
        self.errors.lock().unwrap().clone()
    }

    pub(crate) fn attempts(&self) -> Vec<u32> {
        self.attempts.lock().unwrap().clone()
    }
}

impl ExceptionBehaviour for RecordingBehaviour {
    fn on_fault(&self, error: &ServiceError) -> HookResult {
        self.record("fault", error)
    }

    fn on_communication(&self, error: &ServiceError) -> HookResult {
        self.record("communication", error)
    }

    fn on_timeout(&self, error: &ServiceError) -> HookResult {
        self.record("timeout", error)
    }

    fn on_unexpected(&self, error: &ServiceError) -> HookResult {
        self.record("unexpected", error)
    }

    fn on_close_communication(&self, error: &ServiceError) -> HookResult {
        self.record("close_communication", error)
    }

    fn on_close_timeout(&self, error: &ServiceError) -> HookResult {
        self.record("close_timeout", error)
    }

    fn on_close_unexpected(&self, error: &ServiceError) -> HookResult {
        self.record("close_unexpected", error)
    }

    fn on_abort(&self, error: &ServiceError) -> HookResult {
        self.record("abort", error)
    }

    fn on_retry_attempt(&self, error: &ServiceError, attempt: u32) -> HookResult {
        self.attempts.lock().unwrap().push(attempt);
        self.record("retry_attempt", error)
    }

    fn on_destructor(&self, error: &ServiceError) -> HookResult {
        self.record("destructor", error)
    }
}

/// Collects lifecycle event kinds.
#[derive(Default)]
pub(crate) struct EventLog {
    kinds: Mutex<Vec<ChannelEventKind>>,
}

impl EventLog {
    pub(crate) fn kinds(&self) -> Vec<ChannelEventKind> {
        self.kinds.lock().unwrap().clone()
    }
}

impl Observe<ChannelEvent> for EventLog {
    fn on_event(&self, event: &ChannelEvent) {
        self.kinds.lock().unwrap().push(event.kind);
    }
}
