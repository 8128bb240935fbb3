//! Consumer facade, operation descriptors, configuration and factory.
//!
//! ## Contents
//! - [`Consumer`], [`WeakConsumer`] the application-facing handle
//! - [`Operations`] pass-through surface (no retry)
//! - [`Operation`], [`OperationResult`] result-wrapping surface (`consume`, `consume_async`)
//! - [`ConsumerConfig`], [`ConsumerBuilder`] configuration
//! - [`ConsumerFactory`] creation from process-wide defaults

mod builder;
mod config;
mod facade;
mod factory;
mod operation;
mod operations;
mod result;

pub use builder::ConsumerBuilder;
pub use config::ConsumerConfig;
pub use facade::{Consumer, WeakConsumer};
pub use factory::ConsumerFactory;
pub use operation::Operation;
pub use operations::Operations;
pub use result::OperationResult;
