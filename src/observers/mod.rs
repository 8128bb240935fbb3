//! Weak observer registry.
//!
//! ## Contents
//! - [`Observe`] synchronous listener trait
//! - [`ObserverRegistry`] fan-out over `Weak` handles
//! - [`SubscriptionId`] handle used to unsubscribe deterministically

mod observer;
mod registry;

pub use observer::Observe;
pub use registry::{ObserverRegistry, SubscriptionId};
