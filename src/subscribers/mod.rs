//! # Asynchronous subscribers for proxy lifecycle events.
//!
//! Synchronous, in-line reactions to a single proxy go through
//! [`ObserverRegistry`](crate::ObserverRegistry). This module covers the other
//! side: consumers that want to watch channel churn from async code, through
//! the [`Bus`](crate::events::Bus) every consumer owns.
//!
//! ## Architecture
//! ```text
//! RetryEnabledProxy ── publish(ChannelEvent) ──► Bus ──► SubscriberSet
//!                                                           ├──► LogWriter
//!                                                           └──► custom Subscribe impls
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
