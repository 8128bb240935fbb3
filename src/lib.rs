//! # channelvisor
//!
//! **Channelvisor** is a resilience layer in front of remote-procedure-call clients.
//!
//! It guarantees that a channel to a remote service is always torn down
//! correctly (close, falling back to abort), classifies every failure crossing
//! the channel boundary, and lets callers plug in fault-handling hooks and retry
//! policies. Errors either reach the caller of the pass-through surface or are
//! captured in an [`OperationResult`] by `consume`.
//!
//! ## Architecture
//! ### Overview
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Consumer (application handle)                                    │
//! │  - operations()   pass-through, no retry                          │
//! │  - consume(op)    retry + OperationResult                         │
//! │  - consume_async  same, on the blocking pool                      │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  RetryEnabledProxy                                                │
//! │  - RetryPolicy around each call, attempt counter                  │
//! │  - lazily (re)creates the ChannelProxy                            │
//! │  - forwards proxy events to the Bus                               │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  ChannelProxy (owns one RemoteChannel)                            │
//! │  - ExceptionBehaviour hooks (failsafe-guarded)                    │
//! │  - CloseTrigger decision after a failed call                      │
//! │  - close → abort → dispose teardown, exactly once                 │
//! └──────┬──────────────────────────────────────────────┬─────────────┘
//!        │ events (ObserverRegistry, weak)              │ faulted (weak)
//!        ▼                                              ▼
//!  RetryEnabledProxy ──► Bus ──► SubscriberSet     RemoteChannel
//! ```
//!
//! ### Teardown
//! ```text
//! state != Faulted ─► Closing ─► close() ─ ok ─► Closed ─────────────┐
//!                                   └─ err ─► close hook ─┐          │
//! state == Faulted ───────────────────────────────────────┴► Aborting │
//!                                         ─► abort() ─ ok ─► Aborted  │
//!                                              └─ err ─► abort hook   │
//! always: unsubscribe Faulted, release channel, Disposed ◄────────────┘
//! ```
//!
//! ## Features
//! | Area             | Description                                              | Key types / traits                                  |
//! |------------------|----------------------------------------------------------|-----------------------------------------------------|
//! | **Consumer**     | Pass-through and result-wrapping calls, disposal.        | [`Consumer`], [`Operations`], [`Operation`]         |
//! | **Lifecycle**    | Close-or-abort teardown of one channel.                  | [`ChannelProxy`], [`RemoteChannel`]                 |
//! | **Retry**        | Policy contract, fixed-interval policy, wrapper.         | [`RetryPolicy`], [`FixedIntervalRetry`]             |
//! | **Hooks**        | Per-kind, per-phase error callbacks; close decision.     | [`ExceptionBehaviour`], [`CloseTrigger`]            |
//! | **Errors**       | Failure taxonomy.                                        | [`ServiceError`], [`ErrorKind`]                     |
//! | **Events**       | Weak observers, broadcast bus, async subscribers.        | [`ObserverRegistry`], [`Bus`], [`Subscribe`]        |
//! | **Configuration**| Per-consumer settings and process-wide defaults.         | [`ConsumerConfig`], [`ConsumerFactory`]             |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use channelvisor::{
//!     ChannelState, Consumer, FixedIntervalRetry, ObserverRegistry, Operation, RemoteChannel,
//!     ServiceError,
//! };
//!
//! #[derive(Default)]
//! struct Calculator {
//!     faulted: ObserverRegistry<ChannelState>,
//! }
//!
//! impl Calculator {
//!     fn add(&self, a: i32, b: i32) -> Result<i32, ServiceError> {
//!         Ok(a + b)
//!     }
//! }
//!
//! impl RemoteChannel for Calculator {
//!     fn state(&self) -> ChannelState { ChannelState::Opened }
//!     fn close(&self) -> Result<(), ServiceError> { Ok(()) }
//!     fn abort(&self) -> Result<(), ServiceError> { Ok(()) }
//!     fn faulted(&self) -> &ObserverRegistry<ChannelState> { &self.faulted }
//! }
//!
//! let consumer = Consumer::builder(|| Ok(Arc::new(Calculator::default())))
//!     .with_retry_policy(Arc::new(FixedIntervalRetry::new(2, Duration::from_millis(10))))
//!     .build();
//!
//! let res = consumer.consume(Operation::new("add", |c: &Calculator| c.add(1, 2)).arg(1).arg(2));
//! assert!(res.has_no_exception());
//! assert_eq!(res.value(), Some(&3));
//!
//! consumer.dispose();
//! ```
mod channel;
mod consumer;
mod error;
mod events;
mod observers;
mod retry;
mod strategies;
mod subscribers;

#[cfg(test)]
mod test_support;

// ---- Public re-exports ----

pub use channel::{
    ChannelFactory, ChannelProxy, ChannelState, ProxyId, ProxySettings, ProxyState, RemoteChannel,
};
pub use consumer::{
    Consumer, ConsumerBuilder, ConsumerConfig, ConsumerFactory, Operation, OperationResult,
    Operations, WeakConsumer,
};
pub use error::{ErrorKind, FaultDetail, ServiceError};
pub use events::{Bus, ChannelEvent, ChannelEventKind};
pub use observers::{Observe, ObserverRegistry, SubscriptionId};
pub use retry::{
    is_transient, FixedIntervalRetry, ProxyFactory, RetryEnabledProxy, RetryPolicy,
    TransientPredicate,
};
pub use strategies::{
    CloseTrigger, DefaultCloseTrigger, ExceptionBehaviour, HookResult, NeverCloseTrigger,
    NullBehaviour, StandardErrorBehaviour, StandardOutBehaviour,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
