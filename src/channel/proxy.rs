//! # Channel lifecycle proxy.
//!
//! [`ChannelProxy`] owns exactly one [`RemoteChannel`] and routes every call
//! through [`ChannelProxy::invoke`]. After a failed call it reports the error to
//! the [`ExceptionBehaviour`] and asks the [`CloseTrigger`] whether the channel
//! must go. A `Faulted` publication from the channel triggers teardown directly.
//!
//! ```text
//! invoke(call)
//!   ├─► call(&channel)            (panics become Unexpected)
//!   ├─► Err? ─► behaviour hook    (failsafe-guarded)
//!   └─► close trigger? ─► teardown
//!
//! channel.faulted() ──(weak)──► teardown
//!
//! teardown (runs once):
//!   state != Faulted ─► Closing ─► close() ─ ok ─► Closed ───────────────┐
//!                                     └─ err ─► close hook ─┐            │
//!   state == Faulted ───────────────────────────────────────┴► Aborting  │
//!                                              ─► abort() ─ ok ─► Aborted │
//!                                                   └─ err ─► abort hook  │
//!   always (scoped guard): unsubscribe Faulted, drop channel, Disposed ◄──┘
//!                          then drop every lifecycle subscription
//! ```
//!
//! ## Rules
//! - Teardown runs at most once per proxy, whatever the number of concurrent or
//!   re-entrant triggers.
//! - No lock is held while the channel, a hook, or an observer is called.
//! - Close and abort errors never leave teardown.
//! - A disposed proxy is never reused; callers create a new one.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use crate::channel::{ChannelState, RemoteChannel};
use crate::error::{panic_message, ServiceError};
use crate::events::{ChannelEvent, ChannelEventKind};
use crate::observers::{Observe, ObserverRegistry, SubscriptionId};
use crate::strategies::failsafe;
use crate::strategies::{CloseTrigger, DefaultCloseTrigger, ExceptionBehaviour, NullBehaviour};

/// Process-unique identifier of a proxy instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProxyId(u64);

impl ProxyId {
    /// Allocates the next identifier.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ProxyId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProxyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proxy-{}", self.0)
    }
}

/// Lifecycle state of a proxy.
///
/// `Active → Closing → Disposed`, `Active → Aborting → Disposed`, or
/// `Active → Closing → Aborting → Disposed` when close fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyState {
    /// Owns a channel and accepts calls.
    Active,
    /// `close()` is in progress.
    Closing,
    /// `abort()` is in progress.
    Aborting,
    /// Terminal: the channel has been released.
    Disposed,
}

impl ProxyState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ProxyState::Active => "active",
            ProxyState::Closing => "closing",
            ProxyState::Aborting => "aborting",
            ProxyState::Disposed => "disposed",
        }
    }
}

/// Strategies a proxy applies to its calls.
#[derive(Clone)]
pub struct ProxySettings {
    /// Hooks invoked for call, close and abort errors.
    pub behaviour: Arc<dyn ExceptionBehaviour>,
    /// Decides whether a failed call tears the channel down.
    pub close_trigger: Arc<dyn CloseTrigger>,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            behaviour: NullBehaviour::shared(),
            close_trigger: DefaultCloseTrigger::shared(),
        }
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings").finish_non_exhaustive()
    }
}

/// Owns one remote channel and guarantees its close-or-abort teardown.
///
/// Cloning is cheap and yields another handle to the same proxy. Dropping the
/// last handle runs teardown if it never ran.
pub struct ChannelProxy<C: RemoteChannel> {
    inner: Arc<ProxyInner<C>>,
}

impl<C: RemoteChannel> Clone for ChannelProxy<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: RemoteChannel> fmt::Debug for ChannelProxy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelProxy")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl<C: RemoteChannel> ChannelProxy<C> {
    /// Takes ownership of `channel` and subscribes to its Faulted notification.
    pub fn new(channel: Arc<C>, settings: ProxySettings) -> Self {
        let inner = Arc::new_cyclic(|weak| ProxyInner {
            id: ProxyId::next(),
            channel: Mutex::new(None),
            settings: RwLock::new(settings),
            tearing_down: AtomicBool::new(false),
            state: Mutex::new(ProxyState::Active),
            events: ObserverRegistry::new(),
            faulted_watch: Arc::new(FaultedWatch {
                proxy: weak.clone(),
            }),
            faulted_sub: Mutex::new(None),
        });

        let sub = channel.faulted().subscribe(&inner.faulted_watch);
        *lock(&inner.faulted_sub) = Some(sub);
        *lock(&inner.channel) = Some(channel);

        tracing::debug!(proxy = %inner.id, "proxy created");
        Self { inner }
    }

    /// Identifier of this proxy.
    pub fn id(&self) -> ProxyId {
        self.inner.id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProxyState {
        *lock(&self.inner.state)
    }

    /// Returns `true` once teardown has released the channel.
    pub fn is_disposed(&self) -> bool {
        self.state() == ProxyState::Disposed
    }

    /// State of the owned channel, or `None` once disposed.
    pub fn channel_state(&self) -> Option<ChannelState> {
        self.inner.channel().map(|c| c.state())
    }

    /// Lifecycle notifications of this proxy (`Closing`, `Closed`, `Aborting`,
    /// `Aborted`, `Disposed`).
    pub fn events(&self) -> &ObserverRegistry<ChannelEvent> {
        &self.inner.events
    }

    /// Replaces the behaviour used for subsequent errors.
    pub fn set_behaviour(&self, behaviour: Arc<dyn ExceptionBehaviour>) {
        write_lock(&self.inner.settings).behaviour = behaviour;
    }

    /// Replaces the close trigger used after subsequent calls.
    pub fn set_close_trigger(&self, close_trigger: Arc<dyn CloseTrigger>) {
        write_lock(&self.inner.settings).close_trigger = close_trigger;
    }

    /// Calls `call` on the owned channel.
    ///
    /// Errors are reduced to their root cause, reported to the behaviour and
    /// returned unchanged. A panic inside `call` is reported as
    /// [`ServiceError::Unexpected`]. Returns [`ServiceError::ChannelDisposed`]
    /// without calling anything if the proxy is disposed.
    pub fn invoke<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&C) -> Result<T, ServiceError>,
    {
        let Some(channel) = self.inner.channel() else {
            return Err(ServiceError::ChannelDisposed);
        };

        let outcome = match catch_unwind(AssertUnwindSafe(|| call(&channel))) {
            Ok(res) => res.map_err(ServiceError::into_root_cause),
            Err(panic) => Err(ServiceError::from_panic(panic.as_ref())),
        };

        if let Err(err) = &outcome {
            let settings = self.inner.settings();
            failsafe::operation_failed(settings.behaviour.as_ref(), err);

            if settings
                .close_trigger
                .should_close(channel.state(), Some(err))
            {
                tracing::debug!(
                    proxy = %self.inner.id,
                    error = err.as_label(),
                    "close trigger fired"
                );
                self.inner.teardown();
            }
        }
        outcome
    }

    /// Runs teardown now. Idempotent.
    pub fn dispose(&self) {
        self.inner.teardown();
    }
}

/// Shared proxy state; the Faulted subscription points here weakly.
struct ProxyInner<C: RemoteChannel> {
    id: ProxyId,
    channel: Mutex<Option<Arc<C>>>,
    settings: RwLock<ProxySettings>,
    tearing_down: AtomicBool,
    state: Mutex<ProxyState>,
    events: ObserverRegistry<ChannelEvent>,
    faulted_watch: Arc<FaultedWatch<C>>,
    faulted_sub: Mutex<Option<SubscriptionId>>,
}

impl<C: RemoteChannel> ProxyInner<C> {
    fn channel(&self) -> Option<Arc<C>> {
        lock(&self.channel).clone()
    }

    fn settings(&self) -> ProxySettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_state(&self, state: ProxyState) {
        *lock(&self.state) = state;
    }

    fn emit(&self, ev: ChannelEvent) {
        tracing::debug!(
            proxy = %self.id,
            event = ev.kind.as_label(),
            reason = ev.reason.as_deref(),
            "proxy lifecycle"
        );
        self.events.publish(&ev);
    }

    /// Close-or-abort sequence. Only the first caller gets past the guard.
    fn teardown(&self) {
        let Some(channel) = self.channel() else {
            return;
        };
        if self.tearing_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let _release = Release {
            inner: self,
            channel: &channel,
        };

        let behaviour = self.settings().behaviour;
        let state = channel.state();
        if state == ChannelState::Closed {
            return;
        }

        let mut abort_reason = "channel faulted".to_string();
        let mut closed = false;
        if state != ChannelState::Faulted {
            self.set_state(ProxyState::Closing);
            self.emit(ChannelEvent::new(ChannelEventKind::Closing, self.id));
            match guarded(|| channel.close()) {
                Ok(()) => {
                    self.emit(ChannelEvent::new(ChannelEventKind::Closed, self.id));
                    closed = true;
                }
                Err(err) => {
                    failsafe::close_failed(behaviour.as_ref(), &err);
                    abort_reason = format!("close failed: {err}");
                }
            }
        }

        if !closed {
            self.set_state(ProxyState::Aborting);
            self.emit(
                ChannelEvent::new(ChannelEventKind::Aborting, self.id).with_reason(abort_reason),
            );
            match guarded(|| channel.abort()) {
                Ok(()) => self.emit(ChannelEvent::new(ChannelEventKind::Aborted, self.id)),
                Err(err) => failsafe::abort_failed(behaviour.as_ref(), &err),
            }
        }
    }
}

impl<C: RemoteChannel> Drop for ProxyInner<C> {
    fn drop(&mut self) {
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| self.teardown())) {
            tracing::error!(
                target: failsafe::FAILSAFE_TARGET,
                proxy = %self.id,
                panic = %panic_message(panic.as_ref()),
                "teardown panicked while dropping proxy"
            );
        }
    }
}

/// Scoped release at the end of teardown; runs on every exit path.
struct Release<'a, C: RemoteChannel> {
    inner: &'a ProxyInner<C>,
    channel: &'a Arc<C>,
}

impl<C: RemoteChannel> Drop for Release<'_, C> {
    fn drop(&mut self) {
        if let Some(sub) = lock(&self.inner.faulted_sub).take() {
            self.channel.faulted().unsubscribe(sub);
        }
        *lock(&self.inner.channel) = None;
        self.inner.set_state(ProxyState::Disposed);
        self.inner
            .emit(ChannelEvent::new(ChannelEventKind::Disposed, self.inner.id));
        self.inner.events.clear();
    }
}

/// Listener on the channel's Faulted registry.
struct FaultedWatch<C: RemoteChannel> {
    proxy: Weak<ProxyInner<C>>,
}

impl<C: RemoteChannel> Observe<ChannelState> for FaultedWatch<C> {
    fn on_event(&self, state: &ChannelState) {
        if *state != ChannelState::Faulted {
            return;
        }
        if let Some(inner) = self.proxy.upgrade() {
            tracing::debug!(proxy = %inner.id, "channel faulted");
            inner.teardown();
        }
    }

    fn name(&self) -> &'static str {
        "faulted_watch"
    }
}

/// Calls a channel operation, turning a panic into an error.
fn guarded<F>(op: F) -> Result<(), ServiceError>
where
    F: FnOnce() -> Result<(), ServiceError>,
{
    match catch_unwind(AssertUnwindSafe(op)) {
        Ok(res) => res.map_err(ServiceError::into_root_cause),
        Err(panic) => Err(ServiceError::from_panic(panic.as_ref())),
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(l: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
