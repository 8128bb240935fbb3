//! # Example: consume
//!
//! Demonstrates the two calling styles of a [`Consumer`].
//!
//! Shows how to:
//! - Implement [`RemoteChannel`] for a hand-written client.
//! - Call through the pass-through surface and get errors back directly.
//! - Wrap calls in an [`Operation`] and read the [`OperationResult`].
//! - Let a [`FixedIntervalRetry`] ride over transient transport failures.
//!
//! ## Flow
//! ```text
//! Consumer::builder(factory)
//!     ├─► operations().call(|c| c.add(..))     single attempt, Result
//!     └─► consume(Operation)                   retry policy, OperationResult
//!           ├─► attempt 1: Communication ─► teardown ─► on_retry_attempt(1)
//!           ├─► attempt 2: Communication ─► teardown ─► on_retry_attempt(2)
//!           └─► attempt 3: fresh channel ─► Ok(5)
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example consume
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use channelvisor::{
    ChannelState, Consumer, ExceptionBehaviour, FixedIntervalRetry, HookResult, ObserverRegistry,
    Operation, RemoteChannel, ServiceError,
};

/// Pretend calculator service that drops its first two connections.
struct Calculator {
    faulted: ObserverRegistry<ChannelState>,
    dialed: Arc<AtomicU32>,
}

impl Calculator {
    fn add(&self, a: i32, b: i32) -> Result<i32, ServiceError> {
        if self.dialed.load(Ordering::SeqCst) <= 2 {
            return Err(ServiceError::communication("connection reset by peer"));
        }
        Ok(a + b)
    }

    fn divide(&self, a: i32, b: i32) -> Result<i32, ServiceError> {
        if b == 0 {
            return Err(ServiceError::fault("division by zero"));
        }
        Ok(a / b)
    }
}

impl RemoteChannel for Calculator {
    fn state(&self) -> ChannelState {
        ChannelState::Opened
    }

    fn close(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn abort(&self) -> Result<(), ServiceError> {
        Ok(())
    }

    fn faulted(&self) -> &ObserverRegistry<ChannelState> {
        &self.faulted
    }
}

/// Prints retry attempts and faults; everything else stays quiet.
struct Console;

impl ExceptionBehaviour for Console {
    fn on_fault(&self, error: &ServiceError) -> HookResult {
        println!("[hook] fault: {error}");
        Ok(())
    }

    fn on_retry_attempt(&self, error: &ServiceError, attempt: u32) -> HookResult {
        println!("[hook] attempt {attempt} failed: {error}");
        Ok(())
    }
}

fn main() {
    let dialed = Arc::new(AtomicU32::new(0));
    let factory = {
        let dialed = Arc::clone(&dialed);
        move || {
            dialed.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(Calculator {
                faulted: ObserverRegistry::new(),
                dialed: Arc::clone(&dialed),
            }))
        }
    };

    let consumer = Consumer::builder(factory)
        .with_retry_policy(Arc::new(FixedIntervalRetry::new(
            2,
            Duration::from_millis(50),
        )))
        .with_behaviour(Arc::new(Console))
        .build();

    let res = consumer.consume(
        Operation::new("add", |c: &Calculator| c.add(2, 3))
            .arg(2)
            .arg(3),
    );
    println!(
        "add(2, 3) = {:?} after {} attempt(s), {} channel(s) dialed",
        res.value(),
        consumer.attempts(),
        dialed.load(Ordering::SeqCst)
    );

    match consumer.operations().call(|c| c.divide(1, 0)) {
        Ok(v) => println!("divide(1, 0) = {v}"),
        Err(e) => println!("divide(1, 0) failed: {} ({})", e, e.as_label()),
    }

    consumer.dispose();
    let after = consumer.consume(Operation::new("add", |c: &Calculator| c.add(1, 1)));
    println!("after dispose: {:?}", after.error().map(ServiceError::as_label));
}
