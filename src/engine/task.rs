use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::engine::node::Node;
use crate::error::EvalError;
use crate::value::Value;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A small process-unique identifier assigned to every task at creation.
///
/// Used in log events and error messages; deep copies receive a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct Memo {
    /// Set while this task sits on the current evaluation stack. A task that
    /// finds its own flag raised has reached itself through its operands.
    visiting: bool,
    result: Value,
}

/// A single computational step: a callable, its operand slots, and a
/// memoization slot for the computed result.
///
/// Tasks are created through [`Scheduler::add`](crate::Scheduler::add) and
/// addressed through [`TaskRef`] handles. Evaluation is demand-driven:
/// requesting a result forces the task, which in turn forces any dependency
/// operands recursively. The result is memoized, so repeated requests through
/// [`Task::get_result`] invoke the callable exactly once; only an explicit
/// [`Task::execute`] runs it again.
///
/// Evaluation is strictly sequential. Forcing the same pending task from two
/// threads at once is outside the evaluation contract and is reported as a
/// cyclic dependency rather than blocking.
pub struct Task {
    id: TaskId,
    node: Box<dyn Node>,
    memo: Mutex<Memo>,
}

impl Task {
    pub(crate) fn new(node: Box<dyn Node>) -> Self {
        Self {
            id: TaskId::next(),
            node,
            memo: Mutex::new(Memo {
                visiting: false,
                result: Value::empty(),
            }),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub(crate) fn output_type_id(&self) -> TypeId {
        self.node.output_type_id()
    }

    pub(crate) fn output_type_name(&self) -> &'static str {
        self.node.output_type_name()
    }

    /// Returns `true` once a memoized result is present.
    pub fn has_result(&self) -> bool {
        self.memo.lock().unwrap().result.has_value()
    }

    /// Returns the task's result typed as `T`, computing it first if no
    /// memoized result exists yet.
    ///
    /// Fails with [`ValueError::TypeMismatch`](crate::ValueError::TypeMismatch)
    /// if the task produces a different type, and with
    /// [`EvalError::CyclicDependency`] if the task reaches itself while
    /// resolving its operands.
    pub fn get_result<T>(&self) -> Result<T, EvalError>
    where
        T: Clone + 'static,
    {
        if !self.has_result() {
            self.execute()?;
        } else {
            tracing::trace!("task {} returns its memoized result", self.id);
        }

        let memo = self.memo.lock().unwrap();
        let value = memo.result.get::<T>().map_err(EvalError::from)?;
        Ok(value.clone())
    }

    /// Unconditionally invokes the callable with freshly resolved operands
    /// and overwrites the memoization slot.
    ///
    /// This deliberately ignores any existing memoized result; bulk execution
    /// through [`Scheduler::execute_all`](crate::Scheduler::execute_all) uses
    /// this path to re-run every owned task.
    pub fn execute(&self) -> Result<(), EvalError> {
        {
            let mut memo = self.memo.lock().unwrap();
            if memo.visiting {
                return Err(EvalError::CyclicDependency(self.id));
            }
            memo.visiting = true;
        }

        tracing::trace!("running task {} ({})", self.id, self.node.output_type_name());

        // The lock is released while the callable runs, since resolving
        // dependency operands recurses into other tasks' `get_result`.
        let outcome = self.node.invoke();

        let mut memo = self.memo.lock().unwrap();
        memo.visiting = false;
        memo.result = outcome?;

        Ok(())
    }
}

// Deep copy: same callable and operand description, independently cloned
// memo, fresh identity. The copy shares no mutable state with the source.
impl Clone for Task {
    fn clone(&self) -> Self {
        let memo = self.memo.lock().unwrap();

        Self {
            id: TaskId::next(),
            node: self.node.clone_node(),
            memo: Mutex::new(Memo {
                visiting: false,
                result: memo.result.clone(),
            }),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("output", &self.node.output_type_name())
            .field("computed", &self.has_result())
            .finish()
    }
}

/// A shared handle to a [`Task`].
///
/// Handles are cheap to clone and all refer to the same underlying task
/// object: schedulers hold them in their ordered lists, and dependency
/// operands hold them inside [`FutureResult`](crate::FutureResult)s. The task
/// lives for as long as any handle to it exists, independent of which
/// scheduler created it.
#[derive(Clone)]
pub struct TaskRef(Arc<Task>);

impl TaskRef {
    pub(crate) fn new(task: Task) -> Self {
        Self(Arc::new(task))
    }

    pub fn id(&self) -> TaskId {
        self.0.id()
    }

    /// See [`Task::get_result`].
    pub fn get_result<T>(&self) -> Result<T, EvalError>
    where
        T: Clone + 'static,
    {
        self.0.get_result()
    }

    /// See [`Task::execute`].
    pub fn execute(&self) -> Result<(), EvalError> {
        self.0.execute()
    }

    /// See [`Task::has_result`].
    pub fn has_result(&self) -> bool {
        self.0.has_result()
    }

    /// Produces an independent deep copy of the underlying task, decoupled
    /// from this handle's task: re-executing one never affects the other.
    pub fn detach(&self) -> Task {
        Task::clone(&self.0)
    }

    pub(crate) fn output_type_id(&self) -> TypeId {
        self.0.output_type_id()
    }

    pub(crate) fn output_type_name(&self) -> &'static str {
        self.0.output_type_name()
    }
}

impl fmt::Debug for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TaskRef({})", self.id())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::error::{EvalError, ValueError};
    use crate::scheduler::Scheduler;

    use super::TaskRef;

    #[test]
    fn test_memoization_is_exactly_once() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();

        let task = {
            let counter = counter.clone();
            scheduler
                .add(
                    move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        42_i32
                    },
                    (),
                )
                .unwrap()
        };

        assert!(!task.has_result());
        assert_eq!(task.get_result::<i32>().unwrap(), 42);
        assert_eq!(task.get_result::<i32>().unwrap(), 42);
        assert!(task.has_result());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_explicit_execute_reruns_a_memoized_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();

        let task = {
            let counter = counter.clone();
            scheduler
                .add(
                    move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        1_i32
                    },
                    (),
                )
                .unwrap()
        };

        assert_eq!(task.get_result::<i32>().unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        task.execute().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(task.get_result::<i32>().unwrap(), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_result_type_mismatch_is_recoverable() {
        let mut scheduler = Scheduler::new();
        let task = scheduler.add(|| 5_i32, ()).unwrap();

        let err = task.get_result::<String>().unwrap_err();
        assert!(matches!(
            err,
            EvalError::Value(ValueError::TypeMismatch { .. })
        ));

        // The failed retrieval still computed and memoized the result.
        assert!(task.has_result());
        assert_eq!(task.get_result::<i32>().unwrap(), 5);
    }

    #[test]
    fn test_detached_copy_is_independent() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();

        let task = {
            let counter = counter.clone();
            scheduler
                .add(
                    move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        7_i32
                    },
                    (),
                )
                .unwrap()
        };

        assert_eq!(task.get_result::<i32>().unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // The copy inherits the memoized value without recomputing.
        let copy = task.detach();
        assert!(copy.has_result());
        assert_eq!(copy.get_result::<i32>().unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // Re-running the copy does not disturb the original.
        copy.execute().unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_eq!(task.get_result::<i32>().unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert_ne!(task.id(), copy.id());
    }

    #[test]
    fn test_detaching_a_pending_task_computes_separately() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut scheduler = Scheduler::new();

        let task = {
            let counter = counter.clone();
            scheduler
                .add(
                    move || {
                        counter.fetch_add(1, Ordering::SeqCst);
                        3_i32
                    },
                    (),
                )
                .unwrap()
        };

        let copy = task.detach();
        assert_eq!(copy.get_result::<i32>().unwrap(), 3);
        assert!(!task.has_result());

        assert_eq!(task.get_result::<i32>().unwrap(), 3);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_self_reference_reports_a_cycle() {
        let slot: Arc<Mutex<Option<TaskRef>>> = Arc::new(Mutex::new(None));
        let mut scheduler = Scheduler::new();

        let task = {
            let slot = slot.clone();
            scheduler
                .add(
                    move || {
                        let guard = slot.lock().unwrap();
                        let me = guard.as_ref().expect("handle installed before evaluation");
                        matches!(
                            me.get_result::<bool>(),
                            Err(EvalError::CyclicDependency(_))
                        )
                    },
                    (),
                )
                .unwrap()
        };

        *slot.lock().unwrap() = Some(task.clone());

        // The inner request hits the task already on the evaluation stack and
        // fails fast instead of recursing forever.
        assert!(task.get_result::<bool>().unwrap());
    }
}
