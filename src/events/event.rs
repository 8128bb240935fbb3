//! # Lifecycle events emitted by channel proxies.
//!
//! The [`ChannelEventKind`] enum classifies the teardown notifications of one
//! [`ChannelProxy`](crate::ChannelProxy):
//!
//! ```text
//! Closing ─► Closed ─────────────────────────► Disposed
//! Closing ─► (close failed) ─► Aborting ─► Aborted ─► Disposed
//!            (state Faulted) ─► Aborting ─► Aborted ─► Disposed
//! ```
//!
//! `Closed` and `Aborted` are only emitted when the channel call succeeded;
//! `Disposed` is always the last event of a proxy.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use channelvisor::{ChannelEvent, ChannelEventKind, ProxyId};
//!
//! let ev = ChannelEvent::new(ChannelEventKind::Aborting, ProxyId::next())
//!     .with_reason("close failed");
//!
//! assert_eq!(ev.kind, ChannelEventKind::Aborting);
//! assert_eq!(ev.reason.as_deref(), Some("close failed"));
//! assert!(ev.kind.makes_channel_unusable());
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::channel::ProxyId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of proxy lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEventKind {
    /// `close()` is about to be called on the channel.
    Closing,

    /// `close()` returned successfully.
    Closed,

    /// `abort()` is about to be called (channel faulted, or close failed).
    ///
    /// Sets:
    /// - `reason`: why the close path was skipped or failed
    Aborting,

    /// `abort()` returned successfully.
    Aborted,

    /// Teardown finished; the proxy no longer owns a channel. Always the last event.
    Disposed,
}

impl ChannelEventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelEventKind::Closing => "closing",
            ChannelEventKind::Closed => "closed",
            ChannelEventKind::Aborting => "aborting",
            ChannelEventKind::Aborted => "aborted",
            ChannelEventKind::Disposed => "disposed",
        }
    }

    /// Returns `true` for the events after which the proxy must not be reused.
    #[inline]
    pub fn makes_channel_unusable(&self) -> bool {
        matches!(
            self,
            ChannelEventKind::Closing | ChannelEventKind::Aborting | ChannelEventKind::Disposed
        )
    }
}

/// Proxy lifecycle event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `proxy`: the proxy that emitted the event
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: ChannelEventKind,
    /// Emitting proxy.
    pub proxy: ProxyId,
    /// Human-readable reason (close failure, faulted state, etc.).
    pub reason: Option<Arc<str>>,
}

impl ChannelEvent {
    /// Creates a new event with current timestamp and next sequence number.
    pub fn new(kind: ChannelEventKind, proxy: ProxyId) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            proxy,
            reason: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}
