//! # Process-wide consumer factory.
//!
//! [`ConsumerFactory`] creates consumers from two mutable process-wide defaults:
//!
//! | default                | initial value             |
//! |------------------------|---------------------------|
//! | `default_retry_policy` | `None` (no retry)         |
//! | `default_behaviour`    | [`StandardErrorBehaviour`] |
//!
//! Changing a default affects consumers created afterwards only.

use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use crate::channel::RemoteChannel;
use crate::consumer::{Consumer, ConsumerConfig};
use crate::error::ServiceError;
use crate::retry::RetryPolicy;
use crate::strategies::{CloseTrigger, ExceptionBehaviour, StandardErrorBehaviour};

static DEFAULT_RETRY_POLICY: RwLock<Option<Arc<dyn RetryPolicy>>> = RwLock::new(None);

static DEFAULT_BEHAVIOUR: LazyLock<RwLock<Arc<dyn ExceptionBehaviour>>> =
    LazyLock::new(|| RwLock::new(StandardErrorBehaviour::shared()));

/// Creates consumers using the process-wide defaults.
#[derive(Debug, Clone, Copy)]
pub struct ConsumerFactory;

impl ConsumerFactory {
    /// Retry policy given to consumers created without one.
    pub fn default_retry_policy() -> Option<Arc<dyn RetryPolicy>> {
        DEFAULT_RETRY_POLICY
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the default retry policy.
    pub fn set_default_retry_policy(policy: Option<Arc<dyn RetryPolicy>>) {
        *DEFAULT_RETRY_POLICY
            .write()
            .unwrap_or_else(PoisonError::into_inner) = policy;
    }

    /// Behaviour given to consumers created without one.
    pub fn default_behaviour() -> Arc<dyn ExceptionBehaviour> {
        DEFAULT_BEHAVIOUR
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replaces the default behaviour.
    pub fn set_default_behaviour(behaviour: Arc<dyn ExceptionBehaviour>) {
        *DEFAULT_BEHAVIOUR
            .write()
            .unwrap_or_else(PoisonError::into_inner) = behaviour;
    }

    /// Restores both defaults to their initial values.
    pub fn reset_defaults() {
        Self::set_default_retry_policy(None);
        Self::set_default_behaviour(StandardErrorBehaviour::shared());
    }

    /// Creates a consumer with the default retry policy and behaviour.
    pub fn create<C, F>(channel_factory: F) -> Consumer<C>
    where
        C: RemoteChannel,
        F: Fn() -> Result<Arc<C>, ServiceError> + Send + Sync + 'static,
    {
        Self::create_with(channel_factory, None, None, None)
    }

    /// Creates a consumer with `policy` and the default behaviour.
    pub fn create_with_retry<C, F>(channel_factory: F, policy: Arc<dyn RetryPolicy>) -> Consumer<C>
    where
        C: RemoteChannel,
        F: Fn() -> Result<Arc<C>, ServiceError> + Send + Sync + 'static,
    {
        Self::create_with(channel_factory, Some(policy), None, None)
    }

    /// Creates a consumer with `behaviour` and the default retry policy.
    pub fn create_with_behaviour<C, F>(
        channel_factory: F,
        behaviour: Arc<dyn ExceptionBehaviour>,
    ) -> Consumer<C>
    where
        C: RemoteChannel,
        F: Fn() -> Result<Arc<C>, ServiceError> + Send + Sync + 'static,
    {
        Self::create_with(channel_factory, None, Some(behaviour), None)
    }

    /// Creates a consumer; every `None` falls back to the process-wide default.
    pub fn create_with<C, F>(
        channel_factory: F,
        policy: Option<Arc<dyn RetryPolicy>>,
        behaviour: Option<Arc<dyn ExceptionBehaviour>>,
        close_trigger: Option<Arc<dyn CloseTrigger>>,
    ) -> Consumer<C>
    where
        C: RemoteChannel,
        F: Fn() -> Result<Arc<C>, ServiceError> + Send + Sync + 'static,
    {
        let defaults = ConsumerConfig::default();
        let cfg = ConsumerConfig {
            retry_policy: policy.or_else(Self::default_retry_policy),
            behaviour: behaviour.unwrap_or_else(Self::default_behaviour),
            close_trigger: close_trigger.unwrap_or(defaults.close_trigger),
            bus_capacity: defaults.bus_capacity,
        };
        Consumer::from_config(channel_factory, cfg)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::strategies::NullBehaviour;
    use crate::test_support::FakeChannel;

    // Tests in this module share the process-wide defaults.
    static SERIAL: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_apply_to_new_consumers_only() {
        let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        ConsumerFactory::reset_defaults();
        assert!(ConsumerFactory::default_retry_policy().is_none());

        let before = ConsumerFactory::create(|| Ok(FakeChannel::new()));
        let twice: Arc<dyn RetryPolicy> =
            Arc::new(|attempt: &mut dyn FnMut() -> Result<(), ServiceError>| {
                attempt().or_else(|_| attempt())
            });
        ConsumerFactory::set_default_retry_policy(Some(twice));
        let after = ConsumerFactory::create(|| Ok(FakeChannel::new()));

        assert!(before.retry_policy().is_none());
        assert!(after.retry_policy().is_some());
        ConsumerFactory::reset_defaults();
    }

    #[test]
    fn factory_consumers_report_to_stderr_by_default() {
        let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        ConsumerFactory::reset_defaults();

        let consumer = ConsumerFactory::create(|| Ok(FakeChannel::new()));

        assert!(Arc::ptr_eq(
            &consumer.behaviour(),
            &StandardErrorBehaviour::shared()
        ));
    }

    #[test]
    fn explicit_arguments_win_over_defaults() {
        let _serial = SERIAL.lock().unwrap_or_else(PoisonError::into_inner);
        ConsumerFactory::reset_defaults();

        let null = NullBehaviour::shared();
        let consumer = ConsumerFactory::create_with_behaviour(|| Ok(FakeChannel::new()), Arc::clone(&null));

        assert!(Arc::ptr_eq(&consumer.behaviour(), &null));
        assert!(!Arc::ptr_eq(
            &ConsumerFactory::default_behaviour(),
            &null
        ));
    }
}
