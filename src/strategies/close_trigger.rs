//! # Close triggers.
//!
//! A [`CloseTrigger`] decides, after every operation call, whether the channel
//! has to be torn down. The channel state and the call's root-cause error (if
//! any) are the inputs.
//!
//! | trigger                 | tears down when                             |
//! |-------------------------|---------------------------------------------|
//! | [`DefaultCloseTrigger`] | an error occurred and it is not a fault     |
//! | [`NeverCloseTrigger`]   | never (only Faulted notifications do)       |
//!
//! A fault leaves the channel usable: the peer answered, just not with a value.

use std::sync::{Arc, LazyLock};

use crate::channel::ChannelState;
use crate::error::ServiceError;

/// Predicate deciding whether a call outcome requires channel teardown.
pub trait CloseTrigger: Send + Sync + 'static {
    /// Returns `true` if the channel must be torn down.
    fn should_close(&self, state: ChannelState, error: Option<&ServiceError>) -> bool;
}

/// Tears down on every non-fault error.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultCloseTrigger;

impl DefaultCloseTrigger {
    /// Returns the process-wide instance.
    pub fn shared() -> Arc<dyn CloseTrigger> {
        static SHARED: LazyLock<Arc<DefaultCloseTrigger>> =
            LazyLock::new(|| Arc::new(DefaultCloseTrigger));
        SHARED.clone()
    }
}

impl CloseTrigger for DefaultCloseTrigger {
    fn should_close(&self, _state: ChannelState, error: Option<&ServiceError>) -> bool {
        error.is_some_and(|e| !e.is_fault())
    }
}

/// Never requests teardown.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCloseTrigger;

impl CloseTrigger for NeverCloseTrigger {
    fn should_close(&self, _state: ChannelState, _error: Option<&ServiceError>) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_trigger_ignores_success_and_faults() {
        let trigger = DefaultCloseTrigger;
        assert!(!trigger.should_close(ChannelState::Opened, None));
        assert!(!trigger.should_close(
            ChannelState::Opened,
            Some(&ServiceError::fault("bad input"))
        ));
        assert!(trigger.should_close(
            ChannelState::Opened,
            Some(&ServiceError::communication("reset"))
        ));
        assert!(trigger.should_close(
            ChannelState::Opened,
            Some(&ServiceError::wrap("add", ServiceError::timeout("5s")))
        ));
    }

    #[test]
    fn never_trigger_never_fires() {
        assert!(!NeverCloseTrigger.should_close(
            ChannelState::Faulted,
            Some(&ServiceError::unexpected("odd"))
        ));
    }
}
