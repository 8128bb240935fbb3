//! # Consumer builder.
//!
//! [`ConsumerBuilder`] starts from [`ConsumerConfig::default`] and lets each setting
//! be overridden before [`build`](ConsumerBuilder::build). Obtain one through
//! [`Consumer::builder`].

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::channel::{ChannelFactory, RemoteChannel};
use crate::consumer::{Consumer, ConsumerConfig};
use crate::retry::{ProxyFactory, RetryPolicy};
use crate::strategies::{CloseTrigger, ExceptionBehaviour};

/// Builder for constructing a [`Consumer`] with optional features.
///
/// ```
/// # use std::sync::Arc;
/// # use std::time::Duration;
/// # use channelvisor::{ChannelState, ObserverRegistry, RemoteChannel, ServiceError};
/// use channelvisor::{Consumer, FixedIntervalRetry, NullBehaviour};
/// # #[derive(Default)]
/// # struct Calculator { faulted: ObserverRegistry<ChannelState> }
/// # impl RemoteChannel for Calculator {
/// #     fn state(&self) -> ChannelState { ChannelState::Opened }
/// #     fn close(&self) -> Result<(), ServiceError> { Ok(()) }
/// #     fn abort(&self) -> Result<(), ServiceError> { Ok(()) }
/// #     fn faulted(&self) -> &ObserverRegistry<ChannelState> { &self.faulted }
/// # }
///
/// let consumer = Consumer::builder(|| Ok(Arc::new(Calculator::default())))
///     .with_retry_policy(Arc::new(FixedIntervalRetry::new(2, Duration::from_millis(50))))
///     .with_behaviour(NullBehaviour::shared())
///     .with_bus_capacity(64)
///     .build();
/// # drop(consumer);
/// ```
pub struct ConsumerBuilder<C: RemoteChannel> {
    channel_factory: ChannelFactory<C>,
    cfg: ConsumerConfig,
    proxy_factory: Option<ProxyFactory<C>>,
    cancellation: Option<CancellationToken>,
}

impl<C: RemoteChannel> ConsumerBuilder<C> {
    /// Creates a builder with [`ConsumerConfig::default`].
    pub fn new(channel_factory: ChannelFactory<C>) -> Self {
        Self {
            channel_factory,
            cfg: ConsumerConfig::default(),
            proxy_factory: None,
            cancellation: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, cfg: ConsumerConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the retry policy applied by `consume`/`consume_async`.
    pub fn with_retry_policy(mut self, policy: Arc<dyn RetryPolicy>) -> Self {
        self.cfg.retry_policy = Some(policy);
        self
    }

    /// Sets the exception behaviour.
    pub fn with_behaviour(mut self, behaviour: Arc<dyn ExceptionBehaviour>) -> Self {
        self.cfg.behaviour = behaviour;
        self
    }

    /// Sets the close trigger.
    pub fn with_close_trigger(mut self, close_trigger: Arc<dyn CloseTrigger>) -> Self {
        self.cfg.close_trigger = close_trigger;
        self
    }

    /// Sets the lifecycle event bus capacity.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.cfg.bus_capacity = capacity;
        self
    }

    /// Replaces the function wrapping channels into proxies.
    pub fn with_proxy_factory(mut self, proxy_factory: ProxyFactory<C>) -> Self {
        self.proxy_factory = Some(proxy_factory);
        self
    }

    /// Shares an external cancellation token (e.g. a child of an application-wide one).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Builds the consumer. No channel is created until the first call.
    pub fn build(self) -> Consumer<C> {
        Consumer::assemble(
            self.channel_factory,
            self.cfg,
            self.proxy_factory,
            self.cancellation,
        )
    }
}
