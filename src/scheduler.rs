use std::fmt;

use crate::engine::{Callable, FutureResult, IntoOperands, OperandList, Task, TaskNode, TaskRef};
use crate::error::{EvalError, SignatureMismatch};

/// An ordered collection of shared task handles.
///
/// A `Scheduler` is the entry point for building a dataflow graph: [`add`]
/// creates tasks, [`future_of`] wires their results into later tasks, and
/// results are pulled either one at a time through [`get_result`] (lazy,
/// memoized) or in bulk through [`execute_all`] (unconditional re-run).
///
/// Task handles are valid operands for *any* scheduler, not just the one that
/// created them; cross-scheduler dependencies are a supported, first-class
/// usage.
///
/// Cloning a scheduler is shallow over handles: the clone shares every task
/// object that existed at clone time, while tasks added afterwards appear in
/// only one of the two lists. Evaluating a shared task through either
/// scheduler stores the memoized result in the one shared task object.
///
/// [`add`]: Scheduler::add
/// [`future_of`]: Scheduler::future_of
/// [`get_result`]: Scheduler::get_result
/// [`execute_all`]: Scheduler::execute_all
#[derive(Clone, Default)]
pub struct Scheduler {
    tasks: Vec<TaskRef>,
}

impl Scheduler {
    /// Creates an empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a task from a callable and its operands, appends it to this
    /// scheduler's list and returns its handle.
    ///
    /// `operands` is a tuple matching the callable's arity: `()`, `(x,)` or
    /// `(x, y)`. Each element is either a literal value or a
    /// [`FutureResult`] produced by [`Scheduler::future_of`]. Dependency
    /// operands are validated here against the output type of the task they
    /// reference, so a mistyped `future_of` fails at construction rather than
    /// at evaluation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use nagare::Scheduler;
    ///
    /// let mut scheduler = Scheduler::new();
    /// let base = scheduler.add(|| 2_i32, ())?;
    /// let doubled = scheduler.add(|x: i32| x * 2, (scheduler.future_of::<i32>(&base),))?;
    ///
    /// assert_eq!(scheduler.get_result::<i32>(&doubled)?, 4);
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn add<F, Args, Ops>(
        &mut self,
        callable: F,
        operands: Ops,
    ) -> Result<TaskRef, SignatureMismatch>
    where
        F: Callable<Args> + Clone,
        Ops: IntoOperands<Args>,
        Ops::List: Clone,
    {
        let operands = operands.into_operands();
        operands.check()?;

        let task = TaskRef::new(Task::new(Box::new(TaskNode { callable, operands })));
        tracing::trace!("scheduled task {}", task.id());

        self.tasks.push(task.clone());
        Ok(task)
    }

    /// Wraps a task handle as a dependency operand carrying the expected
    /// result type `T`. Never triggers evaluation.
    pub fn future_of<T>(&self, task: &TaskRef) -> FutureResult<T> {
        FutureResult::of(task)
    }

    /// Requests the result of `task` typed as `T`, recursively evaluating it
    /// and its unresolved dependencies on demand.
    pub fn get_result<T>(&self, task: &TaskRef) -> Result<T, EvalError>
    where
        T: Clone + 'static,
    {
        task.get_result::<T>()
    }

    /// Executes every task owned by this scheduler, in insertion order,
    /// regardless of memoization state.
    ///
    /// Already-computed tasks run again and their memo slots are overwritten.
    /// The iteration order does not need to respect dependencies; each task
    /// resolves its own operands recursively. The first failure stops the
    /// sweep and propagates.
    pub fn execute_all(&self) -> Result<(), EvalError> {
        tracing::debug!("executing all {} scheduled tasks", self.tasks.len());

        for task in &self.tasks {
            task.execute()?;
        }

        Ok(())
    }

    /// Number of tasks owned by this scheduler.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.tasks.iter().map(|task| task.id()))
            .finish()
    }
}
