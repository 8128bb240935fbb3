//! # Event bus for broadcasting proxy lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`]. Every
//! [`RetryEnabledProxy`](crate::RetryEnabledProxy) forwards the events of the proxies it
//! creates to its bus, so consumers can watch channel churn without holding
//! a reference to short-lived proxies.
//!
//! ```text
//! ChannelProxy ── ObserverRegistry ──► RetryEnabledProxy ── publish ──► Bus ──► Receiver(s)
//!                    (sync, weak)                                (broadcast)
//! ```
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks and needs no runtime.
//! - **Bounded capacity**: slow receivers get `RecvError::Lagged(n)`.
//! - **No persistence**: events published with no receiver are dropped.

use tokio::sync::broadcast;

use super::event::ChannelEvent;

/// Broadcast channel for lifecycle events.
///
/// ### Properties
/// - **Non-blocking**: `publish()` returns immediately.
/// - **Fire-and-forget**: no delivery or durability guarantees.
/// - **Cloneable**: cheap to clone (internally holds an `Arc`-backed sender).
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<ChannelEvent>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to a minimum of 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<ChannelEvent>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active receivers.
    pub fn publish(&self, ev: ChannelEvent) {
        let _ = self.tx.send(ev);
    }

    /// Publishes a borrowed event by cloning it.
    pub fn publish_ref(&self, ev: &ChannelEvent) {
        let _ = self.tx.send(ev.clone());
    }

    /// Creates a new receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.tx.subscribe()
    }

    /// Returns the number of live receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ProxyId;
    use crate::events::ChannelEventKind;

    #[test]
    fn receivers_only_see_events_after_subscribing() {
        let bus = Bus::new(0);
        let proxy = ProxyId::next();

        bus.publish(ChannelEvent::new(ChannelEventKind::Closing, proxy));
        let mut rx = bus.subscribe();
        bus.publish(ChannelEvent::new(ChannelEventKind::Closed, proxy));

        let ev = rx.try_recv().expect("one event");
        assert_eq!(ev.kind, ChannelEventKind::Closed);
        assert!(rx.try_recv().is_err());
    }
}
