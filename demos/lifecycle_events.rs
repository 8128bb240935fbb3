//! # Example: lifecycle_events
//!
//! Demonstrates watching channel churn from async code.
//!
//! Shows how to:
//! - Attach the built-in [`LogWriter`] and a custom [`Subscribe`] to a consumer's bus.
//! - See the close path (Closing/Closed) and the abort path (Aborting/Aborted).
//! - Drain the subscribers with [`SubscriberSet::shutdown`].
//!
//! ## Flow
//! ```text
//! Consumer ─► RetryEnabledProxy ─► Bus ─► SubscriberSet
//!                                           ├─► LogWriter.on_event()
//!                                           └─► Counter.on_event()
//!
//! consume(ok)      ─► nothing published
//! consume(timeout) ─► Closing ─► Closed ─► Disposed
//! transport fault  ─► Aborting(reason) ─► Aborted ─► Disposed
//! ```
//!
//! ## Run
//! Requires the `logging` feature to export [`LogWriter`].
//! ```bash
//! cargo run --example lifecycle_events --features logging
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use channelvisor::{
    ChannelEvent, ChannelEventKind, ChannelState, Consumer, LogWriter, NullBehaviour,
    ObserverRegistry, Operation, RemoteChannel, ServiceError, Subscribe, SubscriberSet,
};

/// Channel whose transport can be broken from the outside.
struct Link {
    state: Mutex<ChannelState>,
    faulted: ObserverRegistry<ChannelState>,
}

impl Link {
    fn ping(&self, slow: bool) -> Result<&'static str, ServiceError> {
        if slow {
            return Err(ServiceError::timeout("ping exceeded 1s"));
        }
        Ok("pong")
    }

    fn break_transport(&self) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ChannelState::Faulted;
        self.faulted.publish(&ChannelState::Faulted);
    }
}

impl RemoteChannel for Link {
    fn state(&self) -> ChannelState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn close(&self) -> Result<(), ServiceError> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ChannelState::Closed;
        Ok(())
    }

    fn abort(&self) -> Result<(), ServiceError> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = ChannelState::Closed;
        Ok(())
    }

    fn faulted(&self) -> &ObserverRegistry<ChannelState> {
        &self.faulted
    }
}

/// Counts disposed proxies.
#[derive(Default)]
struct Counter {
    disposed: AtomicUsize,
}

#[async_trait::async_trait]
impl Subscribe for Counter {
    async fn on_event(&self, ev: &ChannelEvent) {
        if ev.kind == ChannelEventKind::Disposed {
            self.disposed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn name(&self) -> &'static str {
        "counter"
    }
}

#[tokio::main]
async fn main() {
    let consumer = Consumer::builder(|| {
        Ok(Arc::new(Link {
            state: Mutex::new(ChannelState::Opened),
            faulted: ObserverRegistry::new(),
        }))
    })
    .with_behaviour(NullBehaviour::shared())
    .build();

    let counter = Arc::new(Counter::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![
        Arc::new(LogWriter) as Arc<dyn Subscribe>,
        counter.clone() as Arc<dyn Subscribe>,
    ];
    let set = SubscriberSet::new(subs, consumer.bus());

    let ok = consumer
        .consume_async(Operation::new("ping", |c: &Link| c.ping(false)))
        .await;
    println!("ping -> {:?}", ok.value());

    let slow = consumer
        .consume_async(Operation::new("ping", |c: &Link| c.ping(true)).arg("slow"))
        .await;
    println!("slow ping -> {:?}", slow.error().map(ServiceError::as_label));

    let _ = consumer.operations().call(|c| c.ping(false));
    if let Some(proxy) = consumer.wrapper().current_proxy() {
        let _ = proxy.invoke(|c| {
            c.break_transport();
            Ok(())
        });
    }

    consumer.dispose();
    set.shutdown().await;
    println!("proxies disposed: {}", counter.disposed.load(Ordering::Relaxed));
}
