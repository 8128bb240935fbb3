//! # Consumer facade.
//!
//! [`Consumer`] is the entry point applications hold. It composes a
//! [`RetryEnabledProxy`] and offers two calling styles:
//!
//! ```text
//! operations().call(|c| ..)   ──► proxy.invoke          (no retry, errors returned)
//! consume(op)                 ──► retry ─► proxy.invoke  (errors become OperationResult)
//! consume_async(op).await     ──► spawn_blocking(consume(op))
//! ```
//!
//! ## Lifetime
//! - `close()` tears down the current channel; the next call opens a new one.
//! - `dispose()` closes for good; later calls report [`ServiceError::ChannelDisposed`].
//! - Dropping the last handle closes the channel. Anything that goes wrong
//!   there is reported to `on_destructor` and never unwinds out of `drop`.
//!
//! ## Rules
//! - One in-flight call per consumer; use separate consumers for parallel calls.
//! - Lifecycle subscriptions never keep a consumer alive (see [`Consumer::downgrade`]).

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::channel::{ChannelFactory, RemoteChannel};
use crate::consumer::{ConsumerBuilder, ConsumerConfig, Operation, OperationResult, Operations};
use crate::error::ServiceError;
use crate::events::{Bus, ChannelEvent};
use crate::retry::{ProxyFactory, RetryEnabledProxy, RetryPolicy};
use crate::strategies::failsafe;
use crate::strategies::{CloseTrigger, ExceptionBehaviour};

/// Resilient client for one remote service.
///
/// Cloning yields another handle to the same consumer.
pub struct Consumer<C: RemoteChannel> {
    inner: Arc<ConsumerInner<C>>,
}

pub(crate) struct ConsumerInner<C: RemoteChannel> {
    pub(crate) wrapper: RetryEnabledProxy<C>,
    disposed: AtomicBool,
}

impl<C: RemoteChannel> ConsumerInner<C> {
    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn run<T>(&self, op: &Operation<C, T>, policy: Option<&dyn RetryPolicy>) -> OperationResult<T> {
        if self.is_disposed() {
            return OperationResult::failure(ServiceError::ChannelDisposed);
        }
        let res = self.wrapper.invoke_with(policy, |c| op.run(c));
        match &res {
            Ok(_) => tracing::debug!(
                operation = %op,
                attempts = self.wrapper.attempts(),
                "operation succeeded"
            ),
            Err(err) => tracing::debug!(
                operation = %op,
                attempts = self.wrapper.attempts(),
                error = err.as_label(),
                "operation failed"
            ),
        }
        OperationResult::from(res)
    }
}

impl<C: RemoteChannel> Drop for ConsumerInner<C> {
    fn drop(&mut self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| self.wrapper.close())) {
            let err = ServiceError::from_panic(panic.as_ref());
            failsafe::destructor_failed(self.wrapper.behaviour().as_ref(), &err);
        }
    }
}

impl<C: RemoteChannel> Clone for Consumer<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: RemoteChannel> fmt::Debug for Consumer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Consumer")
            .field("wrapper", &self.inner.wrapper)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl<C: RemoteChannel> Consumer<C> {
    /// Creates a consumer; `None` arguments take the [`ConsumerConfig`] defaults.
    pub fn new<F>(
        channel_factory: F,
        retry_policy: Option<Arc<dyn RetryPolicy>>,
        behaviour: Option<Arc<dyn ExceptionBehaviour>>,
        close_trigger: Option<Arc<dyn CloseTrigger>>,
    ) -> Self
    where
        F: Fn() -> Result<Arc<C>, ServiceError> + Send + Sync + 'static,
    {
        let defaults = ConsumerConfig::default();
        let cfg = ConsumerConfig {
            retry_policy,
            behaviour: behaviour.unwrap_or(defaults.behaviour),
            close_trigger: close_trigger.unwrap_or(defaults.close_trigger),
            bus_capacity: defaults.bus_capacity,
        };
        Self::from_config(channel_factory, cfg)
    }

    /// Creates a consumer from a full configuration.
    pub fn from_config<F>(channel_factory: F, cfg: ConsumerConfig) -> Self
    where
        F: Fn() -> Result<Arc<C>, ServiceError> + Send + Sync + 'static,
    {
        Self::assemble(Arc::new(channel_factory), cfg, None, None)
    }

    /// Starts a [`ConsumerBuilder`].
    pub fn builder<F>(channel_factory: F) -> ConsumerBuilder<C>
    where
        F: Fn() -> Result<Arc<C>, ServiceError> + Send + Sync + 'static,
    {
        ConsumerBuilder::new(Arc::new(channel_factory))
    }

    pub(crate) fn assemble(
        channel_factory: ChannelFactory<C>,
        cfg: ConsumerConfig,
        proxy_factory: Option<ProxyFactory<C>>,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let mut wrapper = RetryEnabledProxy::new(
            channel_factory,
            cfg.retry_policy.clone(),
            cfg.proxy_settings(),
            bus,
        );
        if let Some(proxy_factory) = proxy_factory {
            wrapper = wrapper.with_proxy_factory(proxy_factory);
        }
        if let Some(token) = cancellation {
            wrapper = wrapper.with_cancellation(token);
        }
        Self {
            inner: Arc::new(ConsumerInner {
                wrapper,
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Pass-through surface. Calls made through it bypass the retry policy.
    pub fn operations(&self) -> Operations<'_, C> {
        Operations::new(&self.inner)
    }

    /// Runs `op` under the consumer's retry policy and captures the outcome.
    pub fn consume<T>(&self, op: Operation<C, T>) -> OperationResult<T> {
        let policy = self.inner.wrapper.retry_policy();
        self.inner.run(&op, policy.as_deref())
    }

    /// Runs `op` under `policy` instead of the consumer's retry policy.
    pub fn consume_with<T>(
        &self,
        op: Operation<C, T>,
        policy: Arc<dyn RetryPolicy>,
    ) -> OperationResult<T> {
        self.inner.run(&op, Some(policy.as_ref()))
    }

    /// Runs [`consume`](Self::consume) on tokio's blocking pool.
    ///
    /// Must be awaited within a tokio runtime. The calling task is never blocked.
    pub async fn consume_async<T>(&self, op: Operation<C, T>) -> OperationResult<T>
    where
        T: Send + 'static,
    {
        let consumer = self.clone();
        match tokio::task::spawn_blocking(move || consumer.consume(op)).await {
            Ok(res) => res,
            Err(join) if join.is_panic() => {
                OperationResult::failure(ServiceError::from_panic(join.into_panic().as_ref()))
            }
            Err(join) => OperationResult::failure(ServiceError::unexpected(join.to_string())),
        }
    }

    /// Tears down the current channel. Idempotent; the consumer stays usable.
    pub fn close(&self) {
        self.inner.wrapper.close();
    }

    /// Closes the channel and refuses further calls. Idempotent.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            self.inner.wrapper.close();
        }
    }

    /// Returns `true` after [`dispose`](Self::dispose).
    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Requests cooperative cancellation: no further attempt starts.
    pub fn cancel(&self) {
        self.inner.wrapper.cancellation_token().cancel();
    }

    /// Token checked before every attempt.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.wrapper.cancellation_token().clone()
    }

    /// Receives the lifecycle events of every channel this consumer opens.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.inner.wrapper.bus().subscribe()
    }

    /// Lifecycle event bus, e.g. for a [`SubscriberSet`](crate::SubscriberSet).
    pub fn bus(&self) -> &Bus {
        self.inner.wrapper.bus()
    }

    /// Retry-enabled wrapper behind this consumer.
    pub fn wrapper(&self) -> &RetryEnabledProxy<C> {
        &self.inner.wrapper
    }

    /// Current retry policy.
    pub fn retry_policy(&self) -> Option<Arc<dyn RetryPolicy>> {
        self.inner.wrapper.retry_policy()
    }

    /// Replaces the retry policy.
    pub fn set_retry_policy(&self, policy: Option<Arc<dyn RetryPolicy>>) {
        self.inner.wrapper.set_retry_policy(policy);
    }

    /// Current exception behaviour.
    pub fn behaviour(&self) -> Arc<dyn ExceptionBehaviour> {
        self.inner.wrapper.behaviour()
    }

    /// Replaces the exception behaviour.
    pub fn set_behaviour(&self, behaviour: Arc<dyn ExceptionBehaviour>) {
        self.inner.wrapper.set_behaviour(behaviour);
    }

    /// Replaces the close trigger.
    pub fn set_close_trigger(&self, close_trigger: Arc<dyn CloseTrigger>) {
        self.inner.wrapper.set_close_trigger(close_trigger);
    }

    /// Attempts made by the most recent call.
    pub fn attempts(&self) -> u32 {
        self.inner.wrapper.attempts()
    }

    /// Non-owning handle.
    pub fn downgrade(&self) -> WeakConsumer<C> {
        WeakConsumer {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

/// Non-owning handle to a [`Consumer`].
pub struct WeakConsumer<C: RemoteChannel> {
    inner: Weak<ConsumerInner<C>>,
}

impl<C: RemoteChannel> WeakConsumer<C> {
    /// Returns the consumer if a strong handle still exists.
    pub fn upgrade(&self) -> Option<Consumer<C>> {
        self.inner.upgrade().map(|inner| Consumer { inner })
    }
}

impl<C: RemoteChannel> Clone for WeakConsumer<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Weak::clone(&self.inner),
        }
    }
}

impl<C: RemoteChannel> fmt::Debug for WeakConsumer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakConsumer")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::events::ChannelEventKind;
    use crate::retry::FixedIntervalRetry;
    use crate::test_support::{FakeChannel, RecordingBehaviour};

    fn consumer_with(
        policy: Option<Arc<dyn RetryPolicy>>,
    ) -> (
        Consumer<FakeChannel>,
        Arc<RecordingBehaviour>,
        Arc<Mutex<Vec<Arc<FakeChannel>>>>,
    ) {
        let channels: Arc<Mutex<Vec<Arc<FakeChannel>>>> = Arc::default();
        let created = Arc::clone(&channels);
        let behaviour = Arc::new(RecordingBehaviour::default());
        let consumer = Consumer::new(
            move || {
                let channel = FakeChannel::new();
                created.lock().unwrap().push(Arc::clone(&channel));
                Ok(channel)
            },
            policy,
            Some(behaviour.clone()),
            None,
        );
        (consumer, behaviour, channels)
    }

    fn add(a: i32, b: i32) -> Operation<FakeChannel, i32> {
        Operation::new("add", move |c: &FakeChannel| c.add(a, b))
            .arg(a)
            .arg(b)
    }

    #[test]
    fn consume_returns_the_value() {
        let (consumer, behaviour, _) = consumer_with(None);

        let res = consumer.consume(add(1, 2));

        assert!(res.has_no_exception());
        assert_eq!(res.value(), Some(&3));
        assert!(behaviour.calls().is_empty());
    }

    #[test]
    fn consume_captures_errors() {
        let (consumer, _, _) = consumer_with(None);

        let res = consumer.consume(Operation::new("withdraw", |_: &FakeChannel| {
            Err::<(), _>(ServiceError::fault("insufficient funds"))
        }));

        assert!(res.has_exception());
        assert!(res.has_fault_exception());
    }

    #[test]
    fn failing_channel_factory_is_captured_in_the_result() {
        let consumer: Consumer<FakeChannel> = Consumer::new(
            || -> Result<Arc<FakeChannel>, ServiceError> { panic!("endpoint not configured") },
            Some(Arc::new(FixedIntervalRetry::new(1, Duration::ZERO))),
            Some(Arc::new(RecordingBehaviour::default())),
            None,
        );

        let res = consumer.consume(add(1, 2));

        assert!(res.has_exception());
        assert_eq!(res.error().map(ServiceError::kind), Some(ErrorKind::Unexpected));
        assert_eq!(consumer.attempts(), 2);
    }

    #[test]
    fn pass_through_bypasses_retry() {
        let policy: Arc<dyn RetryPolicy> = Arc::new(FixedIntervalRetry::new(3, Duration::ZERO));
        let (consumer, behaviour, _) = consumer_with(Some(policy));
        let tries = AtomicUsize::new(0);

        let err = consumer
            .operations()
            .call(|_| {
                tries.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(ServiceError::communication("reset"))
            })
            .unwrap_err();

        assert!(matches!(err, ServiceError::Communication { .. }));
        assert_eq!(tries.load(Ordering::SeqCst), 1);
        assert!(behaviour.attempts().is_empty());
    }

    #[test]
    fn consume_with_overrides_the_policy() {
        let (consumer, behaviour, channels) = consumer_with(None);
        let tries = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&tries);
        let op = Operation::new("flaky", move |c: &FakeChannel| {
            if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ServiceError::timeout("5s"))
            } else {
                c.add(2, 2)
            }
        });

        let res = consumer.consume_with(op, Arc::new(FixedIntervalRetry::new(1, Duration::ZERO)));

        assert_eq!(res.value(), Some(&4));
        assert_eq!(behaviour.attempts(), vec![1]);
        assert_eq!(channels.lock().unwrap().len(), 2);
    }

    #[test]
    fn double_close_tears_down_once() {
        let (consumer, behaviour, channels) = consumer_with(None);
        let _ = consumer.consume(add(1, 1));

        consumer.close();
        consumer.close();

        assert_eq!(channels.lock().unwrap()[0].close_calls(), 1);
        assert!(behaviour.calls().is_empty());

        let res = consumer.consume(add(1, 1));
        assert!(res.has_no_exception());
        assert_eq!(channels.lock().unwrap().len(), 2);
    }

    #[test]
    fn disposed_consumer_refuses_calls() {
        let (consumer, _, channels) = consumer_with(None);
        let _ = consumer.consume(add(1, 1));

        consumer.dispose();
        consumer.dispose();

        assert!(consumer.is_disposed());
        assert_eq!(channels.lock().unwrap()[0].close_calls(), 1);
        assert!(matches!(
            consumer.consume(add(1, 1)).error(),
            Some(ServiceError::ChannelDisposed)
        ));
        assert!(matches!(
            consumer.operations().call(|c| c.add(1, 1)),
            Err(ServiceError::ChannelDisposed)
        ));
    }

    #[test]
    fn dropping_last_handle_closes_the_channel() {
        let (consumer, _, channels) = consumer_with(None);
        let _ = consumer.consume(add(1, 1));
        let second = consumer.clone();

        drop(consumer);
        assert_eq!(channels.lock().unwrap()[0].close_calls(), 0);

        drop(second);
        assert_eq!(channels.lock().unwrap()[0].close_calls(), 1);
    }

    #[test]
    fn subscriptions_do_not_keep_the_consumer_alive() {
        let (consumer, _, _) = consumer_with(None);
        let _ = consumer.consume(add(1, 1));
        let _rx = consumer.subscribe();
        let weak = consumer.downgrade();
        assert!(weak.upgrade().is_some());

        drop(consumer);

        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn events_are_observable_through_subscribe() {
        let (consumer, _, _) = consumer_with(None);
        let mut rx = consumer.subscribe();
        let _ = consumer.consume(add(1, 1));

        consumer.close();

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert_eq!(kinds.first(), Some(&ChannelEventKind::Closing));
        assert_eq!(kinds.last(), Some(&ChannelEventKind::Disposed));
    }

    #[test]
    fn cancelled_consumer_does_not_call() {
        let (consumer, _, channels) = consumer_with(None);
        consumer.cancel();

        let res = consumer.consume(add(1, 1));

        assert!(matches!(res.error(), Some(ServiceError::Canceled)));
        assert!(channels.lock().unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn consume_async_runs_off_the_caller() {
        let (consumer, _, _) = consumer_with(None);

        let res = consumer.consume_async(add(20, 22)).await;

        assert_eq!(res.into_result().unwrap(), 42);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn consume_async_waits_for_deferred_operations() {
        let (consumer, behaviour, _) = consumer_with(None);
        let op = Operation::deferred("slow_add", |_: &FakeChannel| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Err::<i32, _>(ServiceError::timeout("no reply"))
        });

        let res = consumer.consume_async(op).await;

        assert!(matches!(res.error(), Some(ServiceError::Timeout { .. })));
        assert_eq!(behaviour.calls(), vec!["timeout"]);
    }

    #[tokio::test]
    async fn deferred_operation_on_current_thread_runtime_does_not_hang() {
        let (consumer, _, _) = consumer_with(None);
        let op = Operation::deferred("slow_add", |_: &FakeChannel| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<i32, ServiceError>(3)
        });

        let res = consumer.consume(op);

        assert_eq!(res.error().map(ServiceError::kind), Some(ErrorKind::Unexpected));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deferred_operation_on_multi_thread_runtime_completes() {
        let (consumer, _, _) = consumer_with(None);
        let op = Operation::deferred("slow_add", |_: &FakeChannel| async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            Ok::<i32, ServiceError>(3)
        });

        assert_eq!(consumer.consume(op).value(), Some(&3));
    }
}
