//! Retry policies and the retry-enabled proxy wrapper.
//!
//! ## Contents
//! - [`RetryPolicy`] invocation contract, [`is_transient`] default predicate
//! - [`FixedIntervalRetry`] constant-delay policy
//! - [`RetryEnabledProxy`] lazy proxy (re)creation with retry around each call

mod fixed;
mod policy;
mod wrapper;

pub use fixed::{FixedIntervalRetry, TransientPredicate};
pub use policy::{is_transient, RetryPolicy};
pub use wrapper::{ProxyFactory, RetryEnabledProxy};
