//! # Non-blocking fan-out of bus events to subscribers.
//!
//! [`SubscriberSet`] attaches to a [`Bus`], pumps every event into one bounded
//! queue per subscriber, and runs each subscriber on its own worker task.
//!
//! ```text
//! Bus ──► pump ──┬──► [queue 1] ──► worker 1 ──► subscriber1.on_event()
//!                ├──► [queue 2] ──► worker 2 ──► subscriber2.on_event()
//!                └──► [queue N] ──► worker N ──► subscriberN.on_event()
//! ```
//!
//! ## Rules
//! - **No cross-subscriber ordering**: subscriber A may process event N while B processes N+5
//! - **Overflow**: event dropped for that subscriber only, logged at `warn`
//! - **Lag**: if the pump falls behind the bus, skipped events are logged at `warn`
//! - **Isolation**: slow/panicking subscriber doesn't affect others
//! - **Per-subscriber FIFO**: each subscriber sees events in order
//!
//! Must be created inside a tokio runtime.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::broadcast::error::RecvError;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::error::panic_message;
use crate::events::{Bus, ChannelEvent};
use crate::subscribers::Subscribe;

/// Per-subscriber channel metadata.
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<ChannelEvent>>,
}

/// Fan-out coordinator for lifecycle event subscribers.
pub struct SubscriberSet {
    pump: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
    stop: CancellationToken,
}

impl SubscriberSet {
    /// Subscribes to `bus` and spawns one worker task per subscriber.
    ///
    /// Events published after this call are delivered.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: &Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<ChannelEvent>>(cap);

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await
                    {
                        tracing::warn!(
                            subscriber = sub.name(),
                            panic = %panic_message(panic_err.as_ref()),
                            "subscriber panicked"
                        );
                    }
                }
            });
            channels.push(SubscriberChannel { name, sender: tx });
            workers.push(handle);
        }

        let stop = CancellationToken::new();
        let pump = tokio::spawn(pump(bus.subscribe(), channels, stop.clone()));
        Self {
            pump,
            workers,
            stop,
        }
    }

    /// Delivers what is already on the bus, then stops every worker.
    pub async fn shutdown(self) {
        self.stop.cancel();
        let _ = self.pump.await;

        for h in self.workers {
            let _ = h.await;
        }
    }
}

async fn pump(
    mut rx: tokio::sync::broadcast::Receiver<ChannelEvent>,
    channels: Vec<SubscriberChannel>,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            res = rx.recv() => match res {
                Ok(ev) => fan_out(&channels, Arc::new(ev)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "subscriber pump lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            },
            _ = stop.cancelled() => {
                while let Ok(ev) = rx.try_recv() {
                    fan_out(&channels, Arc::new(ev));
                }
                break;
            }
        }
    }
}

fn fan_out(channels: &[SubscriberChannel], event: Arc<ChannelEvent>) {
    for channel in channels {
        match channel.sender.try_send(Arc::clone(&event)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(subscriber = channel.name, reason = "full", "event dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!(subscriber = channel.name, reason = "closed", "event dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::channel::ProxyId;
    use crate::events::ChannelEventKind;

    #[derive(Default)]
    struct Collect(Mutex<Vec<ChannelEventKind>>);

    #[async_trait]
    impl Subscribe for Collect {
        async fn on_event(&self, ev: &ChannelEvent) {
            self.0.lock().unwrap().push(ev.kind);
        }
    }

    struct Explode;

    #[async_trait]
    impl Subscribe for Explode {
        async fn on_event(&self, _ev: &ChannelEvent) {
            panic!("subscriber bug");
        }
    }

    #[tokio::test]
    async fn events_reach_every_subscriber_in_order() {
        let bus = Bus::new(16);
        let collect = Arc::new(Collect::default());
        let set = SubscriberSet::new(vec![collect.clone(), Arc::new(Explode)], &bus);

        let proxy = ProxyId::next();
        bus.publish(ChannelEvent::new(ChannelEventKind::Closing, proxy));
        bus.publish(ChannelEvent::new(ChannelEventKind::Closed, proxy));
        bus.publish(ChannelEvent::new(ChannelEventKind::Disposed, proxy));
        set.shutdown().await;

        assert_eq!(
            *collect.0.lock().unwrap(),
            vec![
                ChannelEventKind::Closing,
                ChannelEventKind::Closed,
                ChannelEventKind::Disposed
            ]
        );
    }
}
