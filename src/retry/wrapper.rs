//! # Retry-enabled wrapper.
//!
//! [`RetryEnabledProxy`] keeps one usable [`ChannelProxy`] around and runs the
//! configured [`RetryPolicy`] over the whole call-and-classify cycle.
//!
//! ```text
//! invoke(call)
//!   └─► policy.execute(attempt)        (exactly once without a policy)
//!         attempt:
//!           cancelled? ─► Err(Canceled)
//!           attempt += 1
//!           ensure_proxy()? ─► proxy.invoke(call)   (factory errors count as attempts)
//!           Err(e) ─► on_retry_attempt(e, attempt) ─► Err(e)   (policy decides)
//!
//! proxy events ──(weak)──► ProxyWatch ─┬─► Bus
//!                                      └─► Closing/Aborting/Disposed: drop the proxy
//! ```
//!
//! ## Rules
//! - A proxy is created lazily, and again whenever the current one became unusable.
//! - Attempt numbering starts at 1 for the first try.
//! - The slot lock is never held while a proxy is invoked or disposed.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use tokio_util::sync::CancellationToken;

use crate::channel::{ChannelFactory, ChannelProxy, ProxySettings, RemoteChannel};
use crate::error::ServiceError;
use crate::events::{Bus, ChannelEvent};
use crate::observers::Observe;
use crate::retry::RetryPolicy;
use crate::strategies::failsafe;
use crate::strategies::{CloseTrigger, ExceptionBehaviour};

/// Builds a proxy around a freshly created channel.
pub type ProxyFactory<C> = Arc<dyn Fn(Arc<C>, ProxySettings) -> ChannelProxy<C> + Send + Sync>;

/// Slot holding the current proxy; the watch points here weakly.
type Slot<C> = Mutex<Option<ChannelProxy<C>>>;

/// Lazily (re)creates channel proxies and applies a retry policy around calls.
pub struct RetryEnabledProxy<C: RemoteChannel> {
    channel_factory: ChannelFactory<C>,
    proxy_factory: ProxyFactory<C>,
    retry_policy: RwLock<Option<Arc<dyn RetryPolicy>>>,
    settings: RwLock<ProxySettings>,
    slot: Arc<Slot<C>>,
    watch: Arc<ProxyWatch<C>>,
    attempts: AtomicU32,
    bus: Bus,
    cancel: CancellationToken,
}

impl<C: RemoteChannel> RetryEnabledProxy<C> {
    /// Creates a wrapper; no channel is created until the first call.
    pub fn new(
        channel_factory: ChannelFactory<C>,
        retry_policy: Option<Arc<dyn RetryPolicy>>,
        settings: ProxySettings,
        bus: Bus,
    ) -> Self {
        let slot: Arc<Slot<C>> = Arc::new(Mutex::new(None));
        let watch = Arc::new(ProxyWatch {
            slot: Arc::downgrade(&slot),
            bus: bus.clone(),
        });
        Self {
            channel_factory,
            proxy_factory: Arc::new(ChannelProxy::new),
            retry_policy: RwLock::new(retry_policy),
            settings: RwLock::new(settings),
            slot,
            watch,
            attempts: AtomicU32::new(0),
            bus,
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the function that wraps new channels into proxies.
    pub fn with_proxy_factory(mut self, proxy_factory: ProxyFactory<C>) -> Self {
        self.proxy_factory = proxy_factory;
        self
    }

    /// Uses `token` for cooperative cancellation instead of a private one.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Runs `call` through the configured retry policy.
    pub fn invoke<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: FnMut(&C) -> Result<T, ServiceError>,
    {
        let policy = self.retry_policy();
        self.invoke_with(policy.as_deref(), call)
    }

    /// Runs `call` through `policy` (exactly once if `None`).
    pub fn invoke_with<T, F>(
        &self,
        policy: Option<&dyn RetryPolicy>,
        mut call: F,
    ) -> Result<T, ServiceError>
    where
        F: FnMut(&C) -> Result<T, ServiceError>,
    {
        self.attempts.store(0, Ordering::Release);

        let Some(policy) = policy else {
            self.check_cancelled()?;
            self.attempts.store(1, Ordering::Release);
            return self.ensure_proxy()?.invoke(&mut call);
        };

        let behaviour = self.behaviour();
        let mut value = None;
        policy.execute(&mut || {
            self.check_cancelled()?;
            let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;
            match self.ensure_proxy().and_then(|proxy| proxy.invoke(&mut call)) {
                Ok(v) => {
                    value = Some(v);
                    Ok(())
                }
                Err(err) => {
                    tracing::debug!(attempt, error = err.as_label(), "attempt failed");
                    failsafe::attempt_failed(behaviour.as_ref(), &err, attempt);
                    Err(err)
                }
            }
        })?;

        value.ok_or_else(|| {
            ServiceError::unexpected("retry policy reported success without a successful attempt")
        })
    }

    /// Calls `call` once on the current proxy, without the retry policy.
    pub fn invoke_once<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&C) -> Result<T, ServiceError>,
    {
        self.check_cancelled()?;
        self.ensure_proxy()?.invoke(call)
    }

    /// Disposes the current proxy; the next call creates a fresh channel.
    pub fn close(&self) {
        let current = lock(&self.slot).take();
        if let Some(proxy) = current {
            tracing::debug!(proxy = %proxy.id(), "closing current proxy");
            proxy.dispose();
        }
    }

    /// Returns `true` if a usable proxy is currently held.
    pub fn is_open(&self) -> bool {
        lock(&self.slot).as_ref().is_some_and(|p| !p.is_disposed())
    }

    /// The current proxy, if one is held.
    pub fn current_proxy(&self) -> Option<ChannelProxy<C>> {
        lock(&self.slot).clone()
    }

    /// Number of attempts made by the most recent call.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Retry policy applied by [`invoke`](Self::invoke).
    pub fn retry_policy(&self) -> Option<Arc<dyn RetryPolicy>> {
        self.retry_policy
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the retry policy.
    pub fn set_retry_policy(&self, policy: Option<Arc<dyn RetryPolicy>>) {
        *self
            .retry_policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = policy;
    }

    /// Behaviour handed to every proxy.
    pub fn behaviour(&self) -> Arc<dyn ExceptionBehaviour> {
        self.proxy_settings().behaviour
    }

    /// Replaces the behaviour, including on the live proxy.
    pub fn set_behaviour(&self, behaviour: Arc<dyn ExceptionBehaviour>) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .behaviour = Arc::clone(&behaviour);
        if let Some(proxy) = self.current_proxy() {
            proxy.set_behaviour(behaviour);
        }
    }

    /// Replaces the close trigger, including on the live proxy.
    pub fn set_close_trigger(&self, close_trigger: Arc<dyn CloseTrigger>) {
        self.settings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .close_trigger = Arc::clone(&close_trigger);
        if let Some(proxy) = self.current_proxy() {
            proxy.set_close_trigger(close_trigger);
        }
    }

    /// Bus receiving the lifecycle events of every proxy this wrapper creates.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Token checked before every attempt.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn proxy_settings(&self) -> ProxySettings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn check_cancelled(&self) -> Result<(), ServiceError> {
        if self.cancel.is_cancelled() {
            return Err(ServiceError::Canceled);
        }
        Ok(())
    }

    /// Returns the live proxy, creating one if needed.
    ///
    /// A channel factory that fails or panics yields the error; no proxy is installed.
    fn ensure_proxy(&self) -> Result<ChannelProxy<C>, ServiceError> {
        if let Some(proxy) = lock(&self.slot).as_ref().filter(|p| !p.is_disposed()) {
            return Ok(proxy.clone());
        }

        let channel = match catch_unwind(AssertUnwindSafe(|| (self.channel_factory)())) {
            Ok(created) => created?,
            Err(panic) => return Err(ServiceError::from_panic(panic.as_ref())),
        };
        let proxy = (self.proxy_factory)(channel, self.proxy_settings());
        proxy.events().subscribe(&self.watch);
        tracing::debug!(proxy = %proxy.id(), "proxy installed");

        let stale = {
            let mut slot = lock(&self.slot);
            if let Some(live) = slot.as_ref().filter(|p| !p.is_disposed()) {
                return Ok(live.clone());
            }
            slot.replace(proxy.clone())
        };
        drop(stale);
        Ok(proxy)
    }
}

impl<C: RemoteChannel> fmt::Debug for RetryEnabledProxy<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryEnabledProxy")
            .field("current", &self.current_proxy())
            .field("attempts", &self.attempts())
            .finish_non_exhaustive()
    }
}

/// Listener on the current proxy's lifecycle events.
struct ProxyWatch<C: RemoteChannel> {
    slot: Weak<Slot<C>>,
    bus: Bus,
}

impl<C: RemoteChannel> Observe<ChannelEvent> for ProxyWatch<C> {
    fn on_event(&self, event: &ChannelEvent) {
        self.bus.publish_ref(event);

        if !event.kind.makes_channel_unusable() {
            return;
        }
        let Some(slot) = self.slot.upgrade() else {
            return;
        };
        let unusable = {
            let mut slot = lock(&slot);
            match slot.as_ref() {
                Some(current) if current.id() == event.proxy => slot.take(),
                _ => None,
            }
        };
        if let Some(proxy) = unusable {
            tracing::debug!(
                proxy = %proxy.id(),
                event = event.kind.as_label(),
                "proxy unusable, dropped"
            );
            proxy.dispose();
        }
    }

    fn name(&self) -> &'static str {
        "proxy_watch"
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
