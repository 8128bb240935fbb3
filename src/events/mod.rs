//! Proxy lifecycle events: types and broadcast bus.
//!
//! ## Contents
//! - [`ChannelEventKind`], [`ChannelEvent`] event classification and metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `ChannelProxy` teardown (into its `ObserverRegistry`),
//!   `RetryEnabledProxy` (forwards into the `Bus`).
//! - **Consumers**: `RetryEnabledProxy` (drops unusable proxies), `Consumer::subscribe`
//!   receivers, `SubscriberSet` workers.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{ChannelEvent, ChannelEventKind};
