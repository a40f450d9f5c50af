//! Type-erased node values.
//!
//! Nodes in one graph hold values of different types, so the graph stores
//! them behind `Arc<dyn AnyValue>`. Typed access downcasts at the edges.

use std::any::{self, Any};
use std::fmt::Debug;
use std::sync::Arc;

/// A value that can live in a node.
///
/// Implemented for every `T: Any + Send + Sync + PartialEq + Debug`.
pub trait AnyValue: Any + Send + Sync + Debug {
    /// View the value as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Compare with another erased value. Values of different concrete
    /// types are never equal.
    fn dyn_eq(&self, other: &dyn AnyValue) -> bool;

    /// Name of the concrete type, for diagnostics.
    fn type_name(&self) -> &'static str;
}

impl<T> AnyValue for T
where
    T: Any + Send + Sync + PartialEq + Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn AnyValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn type_name(&self) -> &'static str {
        any::type_name::<T>()
    }
}

/// Shared handle to an erased value.
pub type ValueRef = Arc<dyn AnyValue>;

/// Wrap a concrete value.
pub fn value_ref<T: AnyValue>(value: T) -> ValueRef {
    Arc::new(value)
}

/// Borrow the concrete value behind an erased handle.
pub fn downcast_value<T: Any>(value: &ValueRef) -> Option<&T> {
    (**value).as_any().downcast_ref::<T>()
}

/// Name of the concrete type behind an erased handle.
pub fn value_type_name(value: &ValueRef) -> &'static str {
    (**value).type_name()
}

/// Equality of two erased handles.
pub fn values_equal(a: &ValueRef, b: &ValueRef) -> bool {
    (**a).dyn_eq(&**b)
}
