use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;

use crate::engine::task::TaskRef;
use crate::error::{EvalError, SignatureMismatch};

/// A type-safe reference to the not-yet-computed result of another task.
///
/// A `FutureResult<T>` is a lightweight token wired into a task as an operand
/// in place of a literal value. It carries the expected result type `T`, which
/// is checked against the referenced task's actual output type when the
/// operand is wired in. Creating one never triggers evaluation; the referenced
/// task is only forced when the dependent task executes.
pub struct FutureResult<T> {
    pub(crate) task: TaskRef,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FutureResult<T> {
    /// Wraps a task handle for use as a dependency operand.
    pub fn of(task: &TaskRef) -> Self {
        Self {
            task: task.clone(),
            _marker: PhantomData,
        }
    }

    /// The handle of the referenced task.
    pub fn task(&self) -> &TaskRef {
        &self.task
    }
}

impl<T> Clone for FutureResult<T> {
    fn clone(&self) -> Self {
        Self {
            task: self.task.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for FutureResult<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FutureResult({})", self.task.id())
    }
}

/// A single operand slot of a task: either a literal value passed to the
/// callable as-is, or a deferred reference to another task's result.
#[derive(Clone)]
pub enum Operand<T> {
    Literal(T),
    Future(FutureResult<T>),
}

impl<T> Operand<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Produces the concrete argument value for this slot.
    ///
    /// A dependency reference resolves through typed result retrieval on the
    /// referenced task, recursively forcing its evaluation if needed.
    pub(crate) fn resolve(&self) -> Result<T, EvalError> {
        match self {
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Future(future) => future.task.get_result::<T>(),
        }
    }

    pub(crate) fn check(&self, position: usize) -> Result<(), SignatureMismatch> {
        match self {
            Operand::Literal(_) => Ok(()),
            Operand::Future(future) => {
                if future.task.output_type_id() == TypeId::of::<T>() {
                    Ok(())
                } else {
                    Err(SignatureMismatch {
                        position,
                        expected: std::any::type_name::<T>(),
                        found: future.task.output_type_name(),
                    })
                }
            }
        }
    }
}

impl<T> From<T> for Operand<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn from(value: T) -> Self {
        Operand::Literal(value)
    }
}

impl<T> From<FutureResult<T>> for Operand<T> {
    fn from(future: FutureResult<T>) -> Self {
        Operand::Future(future)
    }
}

/// An ordered list of operand slots, resolved together right before the
/// callable runs.
///
/// Implemented for `()` and for tuples of [`Operand`]s up to the supported
/// arity. `Values` is the tuple of concrete argument types handed to the
/// callable.
pub trait OperandList: Send + Sync + 'static {
    /// The resulting tuple type when every slot is resolved.
    type Values;

    /// Resolves every slot, recursively forcing unresolved dependencies.
    fn resolve(&self) -> Result<Self::Values, EvalError>;

    /// Validates every dependency slot against the output type of the task
    /// it references.
    fn check(&self) -> Result<(), SignatureMismatch>;
}

impl OperandList for () {
    type Values = ();

    fn resolve(&self) -> Result<Self::Values, EvalError> {
        Ok(())
    }

    fn check(&self) -> Result<(), SignatureMismatch> {
        Ok(())
    }
}

macro_rules! impl_operand_list {
    ($($T:ident => $idx:tt),+) => {
        #[allow(non_snake_case)]
        impl<$($T),+> OperandList for ($(Operand<$T>,)+)
        where
            $($T: Clone + Send + Sync + 'static),+
        {
            type Values = ($($T,)+);

            fn resolve(&self) -> Result<Self::Values, EvalError> {
                let ($($T,)+) = self;
                Ok(($($T.resolve()?,)+))
            }

            fn check(&self) -> Result<(), SignatureMismatch> {
                let ($($T,)+) = self;
                $($T.check($idx)?;)+
                Ok(())
            }
        }
    };
}

impl_operand_list!(A => 0);
impl_operand_list!(A => 0, B => 1);

/// Conversion of user-supplied operands into an [`OperandList`].
///
/// This is what lets [`Scheduler::add`](crate::Scheduler::add) accept plain
/// literals and [`FutureResult`]s side by side in one tuple: each element is
/// converted through `Into<Operand<_>>`, with `Args` pinned to the callable's
/// argument tuple so inference flows from the callable to the operands.
pub trait IntoOperands<Args> {
    /// The operand list this conversion produces.
    type List: OperandList<Values = Args>;

    fn into_operands(self) -> Self::List;
}

impl IntoOperands<()> for () {
    type List = ();

    fn into_operands(self) -> Self::List {}
}

impl<A, X> IntoOperands<(A,)> for (X,)
where
    A: Clone + Send + Sync + 'static,
    X: Into<Operand<A>>,
{
    type List = (Operand<A>,);

    fn into_operands(self) -> Self::List {
        (self.0.into(),)
    }
}

impl<A, B, XA, XB> IntoOperands<(A, B)> for (XA, XB)
where
    A: Clone + Send + Sync + 'static,
    B: Clone + Send + Sync + 'static,
    XA: Into<Operand<A>>,
    XB: Into<Operand<B>>,
{
    type List = (Operand<A>, Operand<B>);

    fn into_operands(self) -> Self::List {
        (self.0.into(), self.1.into())
    }
}
