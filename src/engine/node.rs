use std::any::TypeId;

use crate::engine::Callable;
use crate::engine::operand::OperandList;
use crate::error::EvalError;
use crate::value::Value;

/// The type-erased callable-plus-operands payload stored inside a
/// [`Task`](crate::Task).
///
/// The graph only ever sees this trait; the concrete output type lives behind
/// [`Value`]. Cloning goes through `clone_node` so a task can be deep-copied
/// without knowing its payload type.
pub(crate) trait Node: Send + Sync {
    fn invoke(&self) -> Result<Value, EvalError>;

    fn output_type_id(&self) -> TypeId;

    fn output_type_name(&self) -> &'static str;

    fn clone_node(&self) -> Box<dyn Node>;
}

/// The typed counterpart of [`Node`].
pub(crate) trait TypedNode: Send + Sync {
    /// The concrete output type of this node.
    type Output: Clone + Send + Sync + 'static;

    fn invoke(&self) -> Result<Self::Output, EvalError>;
}

// A blanket implementation to automatically bridge the two. This is where the
// type erasure actually happens.
impl<N> Node for N
where
    N: TypedNode + Clone + 'static,
{
    fn invoke(&self) -> Result<Value, EvalError> {
        // Call the typed method, then erase the result.
        Ok(Value::new(TypedNode::invoke(self)?))
    }

    fn output_type_id(&self) -> TypeId {
        TypeId::of::<N::Output>()
    }

    fn output_type_name(&self) -> &'static str {
        std::any::type_name::<N::Output>()
    }

    fn clone_node(&self) -> Box<dyn Node> {
        Box::new(self.clone())
    }
}

/// A callable paired with its operand slots. One generic node covers every
/// supported arity; the operand tuple decides how many arguments exist.
#[derive(Clone)]
pub(crate) struct TaskNode<F, Ops> {
    pub callable: F,
    pub operands: Ops,
}

impl<F, Ops> TypedNode for TaskNode<F, Ops>
where
    Ops: OperandList,
    F: Callable<Ops::Values>,
{
    type Output = F::Output;

    fn invoke(&self) -> Result<Self::Output, EvalError> {
        let args = self.operands.resolve()?;
        Ok(self.callable.call(args))
    }
}
