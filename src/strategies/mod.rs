//! Pluggable strategies applied by channel proxies.
//!
//! ## Contents
//! - [`ExceptionBehaviour`] hooks per error kind and lifecycle phase
//! - [`NullBehaviour`], [`StandardErrorBehaviour`], [`StandardOutBehaviour`] built-ins
//! - [`CloseTrigger`], [`DefaultCloseTrigger`], [`NeverCloseTrigger`] teardown predicates
//! - `failsafe` (internal) guarded hook dispatch

mod behaviour;
mod close_trigger;
pub(crate) mod failsafe;
mod stream;

pub use behaviour::{ExceptionBehaviour, HookResult};
pub use close_trigger::{CloseTrigger, DefaultCloseTrigger, NeverCloseTrigger};
pub use stream::{NullBehaviour, StandardErrorBehaviour, StandardOutBehaviour};
