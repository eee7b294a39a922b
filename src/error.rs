use thiserror::Error;

use crate::engine::TaskId;

/// Failures of typed access to a [`Value`](crate::Value).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("no value has been stored in this container")]
    Empty,

    #[error("type mismatch: requested `{requested}`, stored `{found}`")]
    TypeMismatch {
        requested: &'static str,
        found: &'static str,
    },
}

/// Failures raised while evaluating a task graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("cyclic dependency detected while evaluating task {0}")]
    CyclicDependency(TaskId),
}

/// A dependency operand was wired to a task producing a different type.
///
/// Reported eagerly by [`Scheduler::add`](crate::Scheduler::add), so a wiring
/// mistake surfaces at construction instead of as a [`ValueError::TypeMismatch`]
/// buried somewhere downstream at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("operand {position} expects a task producing `{expected}`, but the referenced task produces `{found}`")]
pub struct SignatureMismatch {
    pub position: usize,
    pub expected: &'static str,
    pub found: &'static str,
}
