//! # Pass-through call surface.
//!
//! [`Operations`] is the typed handle service adapters are written against.
//! Calls go straight to the channel proxy: errors are classified, reported and
//! may tear the channel down, but **the retry policy is not applied**. Use
//! [`Consumer::consume`](crate::Consumer::consume) for retried calls.
//!
//! ```
//! # use std::sync::Arc;
//! # use channelvisor::{ChannelState, ObserverRegistry, RemoteChannel};
//! use channelvisor::{Consumer, Operations, ServiceError};
//!
//! # #[derive(Default)]
//! # struct CalculatorChannel { faulted: ObserverRegistry<ChannelState> }
//! # impl RemoteChannel for CalculatorChannel {
//! #     fn state(&self) -> ChannelState { ChannelState::Opened }
//! #     fn close(&self) -> Result<(), ServiceError> { Ok(()) }
//! #     fn abort(&self) -> Result<(), ServiceError> { Ok(()) }
//! #     fn faulted(&self) -> &ObserverRegistry<ChannelState> { &self.faulted }
//! # }
//! # impl CalculatorChannel {
//! #     fn send_add(&self, a: i32, b: i32) -> Result<i32, ServiceError> { Ok(a + b) }
//! # }
//! trait Calculator {
//!     fn add(&self, a: i32, b: i32) -> Result<i32, ServiceError>;
//! }
//!
//! impl Calculator for Operations<'_, CalculatorChannel> {
//!     fn add(&self, a: i32, b: i32) -> Result<i32, ServiceError> {
//!         self.call(|c| c.send_add(a, b))
//!     }
//! }
//!
//! let consumer = Consumer::new(|| Ok(Arc::new(CalculatorChannel::default())), None, None, None);
//! assert_eq!(consumer.operations().add(1, 2).unwrap(), 3);
//! ```

use crate::channel::RemoteChannel;
use crate::consumer::facade::ConsumerInner;
use crate::error::ServiceError;

/// Borrowed pass-through handle to a consumer's channel.
pub struct Operations<'a, C: RemoteChannel> {
    consumer: &'a ConsumerInner<C>,
}

impl<'a, C: RemoteChannel> Operations<'a, C> {
    pub(crate) fn new(consumer: &'a ConsumerInner<C>) -> Self {
        Self { consumer }
    }

    /// Calls `call` once on the current channel, creating one if needed.
    ///
    /// Returns [`ServiceError::ChannelDisposed`] if the consumer was disposed.
    pub fn call<T, F>(&self, call: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&C) -> Result<T, ServiceError>,
    {
        if self.consumer.is_disposed() {
            return Err(ServiceError::ChannelDisposed);
        }
        self.consumer.wrapper.invoke_once(call)
    }
}
