use std::any::Any;
use std::fmt;

use crate::error::ValueError;

/// Object-safe view of a stored value. The blanket impl below is where the
/// type erasure actually happens.
trait AnyValue: Any + Send + Sync {
    fn clone_box(&self) -> Box<dyn AnyValue>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn type_name(&self) -> &'static str;
}

impl<T> AnyValue for T
where
    T: Any + Clone + Send + Sync,
{
    fn clone_box(&self) -> Box<dyn AnyValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

/// A type-erased container holding at most one value of any clonable type.
///
/// `Value` is the storage slot behind every task's memoized result. Unlike a
/// plain `Box<dyn Any>` it remembers how to deep-clone its contents, so
/// cloning a `Value` yields a fully independent copy, and it keeps the stored
/// type name around for error reporting.
///
/// Retrieval is type-checked: asking for the wrong type is a recoverable
/// [`ValueError::TypeMismatch`], never a panic. Re-assignment through
/// [`Value::set`] may change the stored type entirely.
///
/// # Example
///
/// ```rust
/// use nagare::Value;
///
/// let mut slot = Value::new(42_i32);
/// assert_eq!(slot.get::<i32>(), Ok(&42));
///
/// slot.set("now a string");
/// assert!(slot.get::<i32>().is_err());
/// assert_eq!(slot.get::<&str>(), Ok(&"now a string"));
/// ```
pub struct Value {
    slot: Option<Box<dyn AnyValue>>,
}

impl Value {
    /// Wraps `value`, erasing its concrete type.
    pub fn new<T>(value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        Self {
            slot: Some(Box::new(value)),
        }
    }

    /// Creates a container with nothing stored in it.
    pub fn empty() -> Self {
        Self { slot: None }
    }

    /// Discards the previous content (whatever type it was) and stores
    /// `value` instead.
    pub fn set<T>(&mut self, value: T)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.slot = Some(Box::new(value));
    }

    /// Returns `true` if a value is currently stored.
    pub fn has_value(&self) -> bool {
        self.slot.is_some()
    }

    /// Name of the stored type, if any. Intended for diagnostics.
    pub fn type_name(&self) -> Option<&'static str> {
        self.slot.as_deref().map(|stored| stored.type_name())
    }

    /// Borrows the stored value as `T`.
    ///
    /// Fails with [`ValueError::Empty`] if nothing is stored, or with
    /// [`ValueError::TypeMismatch`] if the stored type is not `T`.
    pub fn get<T: 'static>(&self) -> Result<&T, ValueError> {
        let stored = self.slot.as_deref().ok_or(ValueError::Empty)?;

        stored
            .as_any()
            .downcast_ref::<T>()
            .ok_or(ValueError::TypeMismatch {
                requested: std::any::type_name::<T>(),
                found: stored.type_name(),
            })
    }

    /// Mutably borrows the stored value as `T`, with the same failure modes
    /// as [`Value::get`].
    pub fn get_mut<T: 'static>(&mut self) -> Result<&mut T, ValueError> {
        let stored = self.slot.as_deref_mut().ok_or(ValueError::Empty)?;
        let found = stored.type_name();

        stored
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(ValueError::TypeMismatch {
                requested: std::any::type_name::<T>(),
                found,
            })
    }
}

impl Clone for Value {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.as_deref().map(|stored| stored.clone_box()),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_name() {
            Some(name) => write!(f, "Value({name})"),
            None => write!(f, "Value(empty)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heterogeneous_slots() {
        let slots = [
            Value::new(1_i32),
            Value::new("some_string"),
            Value::new(vec![1, 2, 3]),
        ];

        assert_eq!(slots[0].get::<i32>(), Ok(&1));
        assert_eq!(slots[1].get::<&str>(), Ok(&"some_string"));
        assert_eq!(slots[2].get::<Vec<i32>>(), Ok(&vec![1, 2, 3]));
    }

    #[test]
    fn test_copy_independence() {
        let mut original = Value::new(vec![1, 2, 3]);
        let copy = original.clone();

        original.get_mut::<Vec<i32>>().unwrap().push(123);

        assert_eq!(original.get::<Vec<i32>>(), Ok(&vec![1, 2, 3, 123]));
        assert_eq!(copy.get::<Vec<i32>>(), Ok(&vec![1, 2, 3]));
    }

    #[test]
    fn test_chained_copies_stay_independent() {
        let mut first = Value::new(vec![1, 2, 3, 4, 5]);
        let mut second = first.clone();
        first.get_mut::<Vec<i32>>().unwrap().push(123);

        let mut third = second.clone();
        assert_eq!(third.get::<Vec<i32>>(), Ok(&vec![1, 2, 3, 4, 5]));

        third = first.clone();
        second.get_mut::<Vec<i32>>().unwrap().push(321);

        assert_eq!(first.get::<Vec<i32>>(), Ok(&vec![1, 2, 3, 4, 5, 123]));
        assert_eq!(second.get::<Vec<i32>>(), Ok(&vec![1, 2, 3, 4, 5, 321]));
        assert_eq!(third.get::<Vec<i32>>(), Ok(&vec![1, 2, 3, 4, 5, 123]));
    }

    #[test]
    fn test_reassignment_changes_stored_type() {
        let mut slot = Value::new(3_i32);
        assert_eq!(slot.get::<i32>(), Ok(&3));

        slot.set(String::from("three"));

        match slot.get::<i32>() {
            Err(ValueError::TypeMismatch { requested, .. }) => {
                assert_eq!(requested, "i32");
            }
            other => panic!("expected a type mismatch, got {other:?}"),
        }
        assert_eq!(slot.get::<String>(), Ok(&String::from("three")));
    }

    #[test]
    fn test_empty_container() {
        let slot = Value::empty();
        assert!(!slot.has_value());
        assert_eq!(slot.type_name(), None);
        assert_eq!(slot.get::<i32>(), Err(ValueError::Empty));
    }

    #[test]
    fn test_set_fills_empty_container() {
        let mut slot = Value::default();
        slot.set(7_u8);
        assert!(slot.has_value());
        assert_eq!(slot.get::<u8>(), Ok(&7));
    }
}
