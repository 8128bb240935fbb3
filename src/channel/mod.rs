//! Remote channel boundary and the proxy that owns a channel's lifecycle.
//!
//! ## Contents
//! - [`RemoteChannel`], [`ChannelState`], [`ChannelFactory`] transport-facing contract
//! - [`ChannelProxy`], [`ProxyId`], [`ProxyState`], [`ProxySettings`] call interception
//!   and close-or-abort teardown

mod proxy;
mod remote;

pub use proxy::{ChannelProxy, ProxyId, ProxySettings, ProxyState};
pub use remote::{ChannelFactory, ChannelState, RemoteChannel};
