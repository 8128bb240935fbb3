//! # Consumer configuration.
//!
//! Provides [`ConsumerConfig`], the settings a [`Consumer`](crate::Consumer) is
//! created from. Used by [`Consumer::from_config`](crate::Consumer::from_config),
//! by [`ConsumerBuilder`](crate::ConsumerBuilder) and by
//! [`ConsumerFactory`](crate::ConsumerFactory) (which fills it from the process-wide defaults).
//!
//! ## Sentinel values
//! - `retry_policy = None` → every call runs exactly once
//! - `bus_capacity = 0` → treated as 1

use std::fmt;
use std::sync::Arc;

use crate::channel::ProxySettings;
use crate::retry::RetryPolicy;
use crate::strategies::{CloseTrigger, DefaultCloseTrigger, ExceptionBehaviour, NullBehaviour};

/// Settings of one consumer.
///
/// ## Field semantics
/// - `retry_policy`: applied by `consume`/`consume_async` (not by the pass-through surface)
/// - `behaviour`: hooks for call, close, abort, retry and drop errors
/// - `close_trigger`: decides whether a failed call tears the channel down
/// - `bus_capacity`: lifecycle event bus ring buffer size (min 1)
#[derive(Clone)]
pub struct ConsumerConfig {
    /// Retry policy for consumed operations.
    pub retry_policy: Option<Arc<dyn RetryPolicy>>,

    /// Exception behaviour shared by every proxy of the consumer.
    pub behaviour: Arc<dyn ExceptionBehaviour>,

    /// Close trigger shared by every proxy of the consumer.
    pub close_trigger: Arc<dyn CloseTrigger>,

    /// Capacity of the lifecycle event bus.
    ///
    /// Receivers lagging more than `bus_capacity` events get `Lagged` and skip
    /// older items.
    pub bus_capacity: usize,
}

impl ConsumerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Strategies handed to each new proxy.
    pub(crate) fn proxy_settings(&self) -> ProxySettings {
        ProxySettings {
            behaviour: Arc::clone(&self.behaviour),
            close_trigger: Arc::clone(&self.close_trigger),
        }
    }
}

impl Default for ConsumerConfig {
    /// Default configuration:
    ///
    /// - `retry_policy = None`
    /// - `behaviour = NullBehaviour` (the factory defaults to `StandardErrorBehaviour`)
    /// - `close_trigger = DefaultCloseTrigger`
    /// - `bus_capacity = 256`
    fn default() -> Self {
        Self {
            retry_policy: None,
            behaviour: NullBehaviour::shared(),
            close_trigger: DefaultCloseTrigger::shared(),
            bus_capacity: 256,
        }
    }
}

impl fmt::Debug for ConsumerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerConfig")
            .field("retry_policy", &self.retry_policy.is_some())
            .field("bus_capacity", &self.bus_capacity)
            .finish_non_exhaustive()
    }
}
