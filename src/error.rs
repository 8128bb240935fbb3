//! Error taxonomy for everything that crosses the channel boundary.
//!
//! Every failure observed by the proxy is a [`ServiceError`]. Each error maps to
//! exactly one [`ErrorKind`], which drives hook dispatch and the default
//! close-trigger decision:
//!
//! - [`ErrorKind::Fault`]: the remote peer reported a business-level failure.
//!   The channel is still healthy; faults are never transient.
//! - [`ErrorKind::Communication`]: transport-level failure.
//! - [`ErrorKind::Timeout`]: the call or the channel operation timed out.
//! - [`ErrorKind::Unexpected`]: anything else (panics, cancellation, unknown errors).
//!
//! Wrapper errors ([`ServiceError::Wrapped`]) carry context only; classification
//! always looks at the root cause.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Taxonomy kind of a [`ServiceError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Business failure explicitly reported by the peer.
    Fault,
    /// Transport-level failure.
    Communication,
    /// Time limit exceeded.
    Timeout,
    /// Uncategorized failure.
    Unexpected,
}

impl ErrorKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ErrorKind::Fault => "fault",
            ErrorKind::Communication => "communication",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Typed payload attached to a fault by the remote peer.
///
/// Downcast with [`ServiceError::fault_detail`].
#[derive(Clone)]
pub struct FaultDetail(Arc<dyn Any + Send + Sync>);

impl FaultDetail {
    /// Wraps a typed detail value.
    pub fn new<D: Any + Send + Sync>(detail: D) -> Self {
        Self(Arc::new(detail))
    }

    /// Returns the detail if it is of type `D`.
    pub fn downcast_ref<D: Any>(&self) -> Option<&D> {
        self.0.downcast_ref::<D>()
    }

    /// Returns `true` if the detail is of type `D`.
    pub fn is<D: Any>(&self) -> bool {
        self.0.is::<D>()
    }
}

impl fmt::Debug for FaultDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FaultDetail(..)")
    }
}

/// # Errors observed on a remote channel.
///
/// Produced by channel implementations, by the proxy itself (panics, disposed
/// channels) and by the consumer (cooperative cancellation).
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    /// The remote service reported a business failure.
    #[error("service fault: {reason}")]
    Fault {
        /// Human-readable reason sent by the peer.
        reason: String,
        /// Optional fault code sent by the peer.
        code: Option<String>,
        /// Optional typed fault payload.
        detail: Option<FaultDetail>,
    },

    /// The transport failed while sending or receiving.
    #[error("communication failure: {message}")]
    Communication {
        /// Transport error message.
        message: String,
    },

    /// The call went through a channel that was already torn down.
    #[error("channel has been disposed")]
    ChannelDisposed,

    /// The operation did not complete in time.
    #[error("timed out: {message}")]
    Timeout {
        /// Timeout description.
        message: String,
        /// The limit that was exceeded, when known.
        after: Option<Duration>,
    },

    /// Anything the taxonomy does not recognize.
    #[error("unexpected error: {message}")]
    Unexpected {
        /// Error description.
        message: String,
    },

    /// The call was cancelled through the consumer's cancellation token.
    #[error("operation cancelled")]
    Canceled,

    /// Context layered over another error; classification uses the root cause.
    #[error("{context}: {source}")]
    Wrapped {
        /// What was being done when the inner error happened.
        context: String,
        /// The wrapped error.
        #[source]
        source: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Builds a [`ServiceError::Fault`] with a reason only.
    pub fn fault(reason: impl Into<String>) -> Self {
        ServiceError::Fault {
            reason: reason.into(),
            code: None,
            detail: None,
        }
    }

    /// Builds a [`ServiceError::Fault`] carrying a typed detail payload.
    pub fn fault_with_detail<D: Any + Send + Sync>(reason: impl Into<String>, detail: D) -> Self {
        ServiceError::Fault {
            reason: reason.into(),
            code: None,
            detail: Some(FaultDetail::new(detail)),
        }
    }

    /// Builds a [`ServiceError::Communication`].
    pub fn communication(message: impl Into<String>) -> Self {
        ServiceError::Communication {
            message: message.into(),
        }
    }

    /// Builds a [`ServiceError::Timeout`] without a known limit.
    pub fn timeout(message: impl Into<String>) -> Self {
        ServiceError::Timeout {
            message: message.into(),
            after: None,
        }
    }

    /// Builds a [`ServiceError::Timeout`] for an exceeded limit.
    pub fn timed_out_after(after: Duration) -> Self {
        ServiceError::Timeout {
            message: format!("no reply within {after:?}"),
            after: Some(after),
        }
    }

    /// Builds a [`ServiceError::Unexpected`].
    pub fn unexpected(message: impl Into<String>) -> Self {
        ServiceError::Unexpected {
            message: message.into(),
        }
    }

    /// Layers `context` over `source`.
    pub fn wrap(context: impl Into<String>, source: ServiceError) -> Self {
        ServiceError::Wrapped {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Converts a caught panic payload into an [`ServiceError::Unexpected`].
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        ServiceError::Unexpected {
            message: format!("panicked: {}", panic_message(payload)),
        }
    }

    /// Returns the innermost error, skipping every [`ServiceError::Wrapped`] layer.
    pub fn root_cause(&self) -> &ServiceError {
        let mut current = self;
        while let ServiceError::Wrapped { source, .. } = current {
            current = source;
        }
        current
    }

    /// Owned variant of [`root_cause`](Self::root_cause).
    pub fn into_root_cause(self) -> ServiceError {
        let mut current = self;
        while let ServiceError::Wrapped { source, .. } = current {
            current = *source;
        }
        current
    }

    /// Classifies the error by its root cause.
    ///
    /// # Example
    /// ```
    /// use channelvisor::{ErrorKind, ServiceError};
    ///
    /// let err = ServiceError::wrap("calling add", ServiceError::timeout("5s"));
    /// assert_eq!(err.kind(), ErrorKind::Timeout);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self.root_cause() {
            ServiceError::Fault { .. } => ErrorKind::Fault,
            ServiceError::Communication { .. } | ServiceError::ChannelDisposed => {
                ErrorKind::Communication
            }
            ServiceError::Timeout { .. } => ErrorKind::Timeout,
            ServiceError::Unexpected { .. } | ServiceError::Canceled => ErrorKind::Unexpected,
            ServiceError::Wrapped { source, .. } => source.kind(),
        }
    }

    /// Returns `true` if the root cause is a fault reported by the peer.
    pub fn is_fault(&self) -> bool {
        self.kind() == ErrorKind::Fault
    }

    /// Returns the typed fault payload if the root cause is a fault carrying a `D`.
    pub fn fault_detail<D: Any>(&self) -> Option<&D> {
        match self.root_cause() {
            ServiceError::Fault {
                detail: Some(detail),
                ..
            } => detail.downcast_ref::<D>(),
            _ => None,
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use channelvisor::ServiceError;
    ///
    /// assert_eq!(ServiceError::ChannelDisposed.as_label(), "channel_disposed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Fault { .. } => "service_fault",
            ServiceError::Communication { .. } => "communication",
            ServiceError::ChannelDisposed => "channel_disposed",
            ServiceError::Timeout { .. } => "timeout",
            ServiceError::Unexpected { .. } => "unexpected",
            ServiceError::Canceled => "canceled",
            ServiceError::Wrapped { source, .. } => source.as_label(),
        }
    }

    /// Returns a human-readable message with details about the root cause.
    pub fn as_message(&self) -> String {
        match self.root_cause() {
            ServiceError::Fault {
                reason,
                code: Some(code),
                ..
            } => format!("fault {code}: {reason}"),
            ServiceError::Fault { reason, .. } => format!("fault: {reason}"),
            ServiceError::Communication { message } => format!("communication: {message}"),
            ServiceError::ChannelDisposed => "channel disposed".to_string(),
            ServiceError::Timeout { message, .. } => format!("timeout: {message}"),
            ServiceError::Unexpected { message } => format!("unexpected: {message}"),
            ServiceError::Canceled => "cancelled".to_string(),
            ServiceError::Wrapped { source, .. } => source.as_message(),
        }
    }
}

/// Extracts the message of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
