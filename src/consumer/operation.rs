//! # Operation descriptors.
//!
//! An [`Operation`] names one remote call, records its argument values for
//! diagnostics, and carries the closure that performs it against a channel.
//! It replaces call-expression introspection: the caller builds the descriptor
//! explicitly.
//!
//! The closure may run several times under a retry policy, so it is `Fn`.
//!
//! ```
//! use channelvisor::{Operation, ServiceError};
//!
//! struct Calculator;
//! impl Calculator {
//!     fn add(&self, a: i32, b: i32) -> Result<i32, ServiceError> { Ok(a + b) }
//! }
//!
//! let (a, b) = (1, 2);
//! let op = Operation::new("add", move |c: &Calculator| c.add(a, b))
//!     .arg(a)
//!     .arg(b);
//!
//! assert_eq!(op.to_string(), "add(1, 2)");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::ServiceError;

type Immediate<C, T> = Arc<dyn Fn(&C) -> Result<T, ServiceError> + Send + Sync>;
type Deferred<C, T> = Arc<dyn Fn(&C) -> BoxFuture<'static, Result<T, ServiceError>> + Send + Sync>;

enum Invocation<C, T> {
    Immediate(Immediate<C, T>),
    Deferred(Deferred<C, T>),
}

impl<C, T> Clone for Invocation<C, T> {
    fn clone(&self) -> Self {
        match self {
            Invocation::Immediate(f) => Invocation::Immediate(Arc::clone(f)),
            Invocation::Deferred(f) => Invocation::Deferred(Arc::clone(f)),
        }
    }
}

/// A named remote call with its argument values.
pub struct Operation<C, T> {
    name: Cow<'static, str>,
    arguments: Vec<String>,
    invocation: Invocation<C, T>,
}

impl<C, T> Operation<C, T> {
    /// Describes a call that completes when `call` returns.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, call: F) -> Self
    where
        F: Fn(&C) -> Result<T, ServiceError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            invocation: Invocation::Immediate(Arc::new(call)),
        }
    }

    /// Describes a call whose result arrives as a future.
    ///
    /// The consumer waits for the future on the calling thread, so its error
    /// goes through the same classification and retry as an immediate call.
    ///
    /// Outside a tokio runtime the future is polled by a local executor. Inside a
    /// multi-thread runtime it is driven by that runtime. A current-thread runtime
    /// cannot be blocked on, so the call fails with [`ServiceError::Unexpected`].
    pub fn deferred<F, Fut>(name: impl Into<Cow<'static, str>>, call: F) -> Self
    where
        C: 'static,
        T: 'static,
        F: Fn(&C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ServiceError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            arguments: Vec::new(),
            invocation: Invocation::Deferred(Arc::new(move |c: &C| call(c).boxed())),
        }
    }

    /// Records one argument value (its `Debug` form).
    pub fn arg(mut self, value: impl fmt::Debug) -> Self {
        self.arguments.push(format!("{value:?}"));
        self
    }

    /// Operation name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Recorded argument values.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Returns `true` if the call completes through a future.
    pub fn is_deferred(&self) -> bool {
        matches!(self.invocation, Invocation::Deferred(_))
    }

    /// Performs the call, waiting for a deferred result.
    pub(crate) fn run(&self, channel: &C) -> Result<T, ServiceError> {
        match &self.invocation {
            Invocation::Immediate(call) => call(channel),
            Invocation::Deferred(call) => wait(call(channel)),
        }
    }
}

fn wait<T>(fut: BoxFuture<'static, Result<T, ServiceError>>) -> Result<T, ServiceError> {
    let Ok(handle) = Handle::try_current() else {
        return futures::executor::block_on(fut);
    };
    match handle.runtime_flavor() {
        RuntimeFlavor::CurrentThread => Err(ServiceError::unexpected(
            "deferred operation cannot block a current-thread tokio runtime",
        )),
        _ => tokio::task::block_in_place(|| handle.block_on(fut)),
    }
}

impl<C, T> Clone for Operation<C, T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            arguments: self.arguments.clone(),
            invocation: self.invocation.clone(),
        }
    }
}

impl<C, T> fmt::Display for Operation<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments.join(", "))
    }
}

impl<C, T> fmt::Debug for Operation<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .field("deferred", &self.is_deferred())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Echo;

    #[test]
    fn deferred_calls_are_awaited() {
        let op = Operation::deferred("echo", |_: &Echo| async {
            Err::<u8, _>(ServiceError::timeout("slow"))
        });

        assert!(op.is_deferred());
        assert!(matches!(op.run(&Echo), Err(ServiceError::Timeout { .. })));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deferred_calls_can_use_the_runtime_timer() {
        let op = Operation::deferred("echo", |_: &Echo| async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok::<_, ServiceError>(3)
        });

        assert_eq!(op.run(&Echo).unwrap(), 3);
    }

    #[tokio::test]
    async fn deferred_calls_on_a_current_thread_runtime_fail_fast() {
        let op = Operation::deferred("echo", |_: &Echo| async {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            Ok::<_, ServiceError>(3)
        });

        assert!(matches!(op.run(&Echo), Err(ServiceError::Unexpected { .. })));
    }

    #[test]
    fn display_lists_arguments() {
        let op = Operation::new("greet", |_: &Echo| Ok(()))
            .arg("bob")
            .arg(3);
        assert_eq!(op.to_string(), "greet(\"bob\", 3)");
        assert_eq!(op.arguments(), ["\"bob\"", "3"]);
    }
}
