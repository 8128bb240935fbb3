//! # Non-owning observer registry.
//!
//! [`ObserverRegistry`] fans a published event out to every live subscriber while
//! holding only [`Weak`] handles, so a subscription is never a reachability path.
//!
//! ## Rules
//! - **Non-owning**: `subscribe` downgrades the `Arc`; dropping the last strong
//!   handle elsewhere ends the subscription implicitly.
//! - **Deterministic removal**: `unsubscribe(id)` removes an entry immediately;
//!   owners are expected to unsubscribe when they dispose what they observe.
//! - **Lock-free delivery**: observers are called after the internal lock is
//!   released, so an observer may subscribe, unsubscribe or publish re-entrantly.
//! - **Panic isolation**: a panicking observer is logged and skipped.
//! - **Pruning**: dead entries are removed on every `publish`/`subscribe`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::error::panic_message;
use crate::observers::Observe;

/// Handle returned by [`ObserverRegistry::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Get the raw id value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

struct Entry<E> {
    id: SubscriptionId,
    name: &'static str,
    observer: Weak<dyn Observe<E>>,
}

/// Registry of weakly-held observers for events of type `E`.
pub struct ObserverRegistry<E> {
    next_id: AtomicU64,
    entries: Mutex<Vec<Entry<E>>>,
}

impl<E: 'static> ObserverRegistry<E> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Subscribes `observer` without taking ownership of it.
    pub fn subscribe<O: Observe<E>>(&self, observer: &Arc<O>) -> SubscriptionId {
        let weak = Arc::downgrade(observer);
        let weak: Weak<dyn Observe<E>> = weak;
        self.insert(observer.name(), weak)
    }

    /// Subscribes an already type-erased observer without taking ownership of it.
    pub fn subscribe_dyn(&self, observer: &Arc<dyn Observe<E>>) -> SubscriptionId {
        self.insert(observer.name(), Arc::downgrade(observer))
    }

    fn insert(&self, name: &'static str, observer: Weak<dyn Observe<E>>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let mut entries = self.lock();
        entries.retain(|e| e.observer.strong_count() > 0);
        entries.push(Entry { id, name, observer });
        id
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        entries.len() != before
    }

    /// Removes every subscription.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Delivers `event` to every live observer, in subscription order.
    ///
    /// Returns the number of observers the event was delivered to.
    pub fn publish(&self, event: &E) -> usize {
        let live: Vec<(&'static str, Arc<dyn Observe<E>>)> = {
            let mut entries = self.lock();
            entries.retain(|e| e.observer.strong_count() > 0);
            entries
                .iter()
                .filter_map(|e| e.observer.upgrade().map(|o| (e.name, o)))
                .collect()
        };

        let delivered = live.len();
        for (name, observer) in live {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| observer.on_event(event))) {
                tracing::warn!(
                    observer = name,
                    info = %panic_message(panic.as_ref()),
                    "observer panicked while handling event"
                );
            }
        }
        delivered
    }

    /// Returns the number of subscriptions whose observer is still alive.
    pub fn len(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| e.observer.strong_count() > 0)
            .count()
    }

    /// Returns `true` if no live observer is subscribed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Entry<E>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<E: 'static> Default for ObserverRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for ObserverRegistry<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl Observe<u8> for Counter {
        fn on_event(&self, _event: &u8) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Panicker;

    impl Observe<u8> for Panicker {
        fn on_event(&self, _event: &u8) {
            panic!("observer blew up");
        }
    }

    /// Unsubscribes itself from the registry it is notified by.
    struct OneShot {
        registry: Arc<ObserverRegistry<u8>>,
        id: Mutex<Option<SubscriptionId>>,
        hits: AtomicUsize,
    }

    impl Observe<u8> for OneShot {
        fn on_event(&self, _event: &u8) {
            self.hits.fetch_add(1, Ordering::SeqCst);
            if let Some(id) = self.id.lock().unwrap().take() {
                self.registry.unsubscribe(id);
            }
        }
    }

    #[test]
    fn subscription_does_not_keep_observer_alive() {
        let registry = ObserverRegistry::<u8>::new();
        let counter = Arc::new(Counter::default());
        registry.subscribe(&counter);

        assert_eq!(Arc::strong_count(&counter), 1);
        assert_eq!(Arc::weak_count(&counter), 1);

        let weak = Arc::downgrade(&counter);
        drop(counter);
        assert!(weak.upgrade().is_none());
        assert_eq!(registry.publish(&1), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let registry = ObserverRegistry::<u8>::new();
        let counter = Arc::new(Counter::default());
        let id = registry.subscribe(&counter);

        registry.publish(&1);
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        registry.publish(&2);

        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_observer_does_not_stop_fan_out() {
        let registry = ObserverRegistry::<u8>::new();
        let panicker = Arc::new(Panicker);
        let counter = Arc::new(Counter::default());
        registry.subscribe(&panicker);
        registry.subscribe(&counter);

        assert_eq!(registry.publish(&1), 2);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn observer_may_unsubscribe_itself_while_notified() {
        let registry = Arc::new(ObserverRegistry::<u8>::new());
        let one_shot = Arc::new(OneShot {
            registry: Arc::clone(&registry),
            id: Mutex::new(None),
            hits: AtomicUsize::new(0),
        });
        let id = registry.subscribe(&one_shot);
        *one_shot.id.lock().unwrap() = Some(id);

        registry.publish(&1);
        registry.publish(&2);

        assert_eq!(one_shot.hits.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 0);
    }
}
