//! # Lifecycle event subscriber trait.
//!
//! Provides [`Subscribe`], an extension point for reacting to proxy lifecycle
//! events asynchronously, away from the thread that tears the channel down.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are caught and logged)
//!
//! ## Architecture
//! ```text
//! Bus ──► SubscriberSet pump ──► [bounded queue] ──► worker task ──► subscriber.on_event()
//!                                                                └─► panic caught → tracing::warn!
//! ```
//!
//! ## Rules
//! - A slow subscriber only affects its own queue.
//! - Queue overflow drops the event **for this subscriber only**.
//! - Events are processed sequentially (FIFO) per subscriber.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use channelvisor::{ChannelEvent, ChannelEventKind, Subscribe};
//!
//! struct AbortAlerts;
//!
//! #[async_trait]
//! impl Subscribe for AbortAlerts {
//!     async fn on_event(&self, ev: &ChannelEvent) {
//!         if ev.kind == ChannelEventKind::Aborting {
//!             // page someone, etc.
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "abort_alerts" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::ChannelEvent;

/// Asynchronous lifecycle event subscriber.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event.
    ///
    /// Called from a dedicated worker task, in FIFO order.
    async fn on_event(&self, event: &ChannelEvent);

    /// Returns the subscriber name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber (clamped to at least 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
