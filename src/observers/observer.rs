//! # Observe: synchronous lifecycle listeners
//!
//! The [`Observe`] trait is the extension point for reacting to notifications
//! published through an [`ObserverRegistry`](crate::ObserverRegistry):
//! - channel proxies publish [`ChannelEvent`](crate::ChannelEvent)s (closing, aborted, disposed…);
//! - remote channels publish [`ChannelState::Faulted`](crate::ChannelState).
//!
//! ```text
//! publisher ── publish(&E) ──► ObserverRegistry ──► upgrade Weak ──► Observe::on_event(&E)
//!                                   (Weak handles)        └─► dropped? pruned
//! ```
//!
//! Observers are called synchronously on the publisher's thread. Registries only
//! keep [`Weak`](std::sync::Weak) handles, so being subscribed never keeps an observer alive.
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use channelvisor::{Observe, ObserverRegistry};
//!
//! #[derive(Default)]
//! struct Counter(AtomicUsize);
//!
//! impl Observe<u32> for Counter {
//!     fn on_event(&self, _event: &u32) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let registry = ObserverRegistry::new();
//! let counter = Arc::new(Counter::default());
//! registry.subscribe(&counter);
//!
//! registry.publish(&7);
//! assert_eq!(counter.0.load(Ordering::SeqCst), 1);
//! ```

/// Receives events published through an [`ObserverRegistry`](crate::ObserverRegistry).
///
/// ### Implementation requirements
/// - Return quickly; the publisher waits for every observer.
/// - Do not panic. Panics are caught and logged, but the event is lost for this observer.
/// - Re-entrancy is allowed: an observer may trigger further publications.
pub trait Observe<E>: Send + Sync + 'static {
    /// Handles a single event.
    fn on_event(&self, event: &E);

    /// Returns the observer name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
