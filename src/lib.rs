#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod engine;
mod error;
mod scheduler;
mod value;

pub use crate::engine::{
    Callable, FutureResult, IntoOperands, Operand, OperandList, Task, TaskId, TaskRef,
};
pub use crate::error::{EvalError, SignatureMismatch, ValueError};
pub use crate::scheduler::Scheduler;
pub use crate::value::Value;

/// Installs a process-wide `tracing` subscriber with an `RUST_LOG`-style
/// environment filter. Intended for host applications that want the engine's
/// trace output without wiring up `tracing-subscriber` themselves.
#[cfg(feature = "logging")]
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();
}
