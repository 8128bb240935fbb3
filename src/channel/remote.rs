//! # Remote channel boundary.
//!
//! The transport itself lives outside this crate. A transport adapter implements
//! [`RemoteChannel`] and hands instances to the crate through a [`ChannelFactory`].
//!
//! ## Contract
//! - `close()` and `abort()` may fail; the proxy reports and absorbs those errors.
//! - When the transport breaks on its own, the channel switches its state to
//!   [`ChannelState::Faulted`] and publishes that state into [`RemoteChannel::faulted`].
//! - Publishing may happen on any thread, with or without a call in flight.

use std::sync::Arc;

use crate::error::ServiceError;
use crate::observers::ObserverRegistry;

/// Connection state of a remote channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelState {
    /// Constructed, not yet opened.
    Created,
    /// Connection in progress.
    Opening,
    /// Ready for calls.
    Opened,
    /// Graceful close in progress.
    Closing,
    /// Closed or aborted; no further calls.
    Closed,
    /// The transport broke; only abort is possible.
    Faulted,
}

impl ChannelState {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelState::Created => "created",
            ChannelState::Opening => "opening",
            ChannelState::Opened => "opened",
            ChannelState::Closing => "closing",
            ChannelState::Closed => "closed",
            ChannelState::Faulted => "faulted",
        }
    }
}

/// A connection to a remote service endpoint.
pub trait RemoteChannel: Send + Sync + 'static {
    /// Current connection state.
    fn state(&self) -> ChannelState;

    /// Gracefully closes the channel.
    fn close(&self) -> Result<(), ServiceError>;

    /// Immediately tears the channel down, discarding pending work.
    fn abort(&self) -> Result<(), ServiceError>;

    /// Registry the channel publishes [`ChannelState::Faulted`] into.
    fn faulted(&self) -> &ObserverRegistry<ChannelState>;
}

/// Creates a fresh channel every time it is called.
pub type ChannelFactory<C> = Arc<dyn Fn() -> Result<Arc<C>, ServiceError> + Send + Sync>;
