//! Type-erased command arguments
//!
//! Commands move values between threads as `Box<dyn Argument>`. Any
//! cloneable, serializable `'static` type is an argument; there is nothing
//! to implement by hand.

use serde::Serialize;
use std::any::{Any, TypeId};
use std::fmt;

/// A value that can be passed to or returned from a command
pub trait Argument: Any + Send + Sync + fmt::Debug + 'static {
    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete type
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Deep copy, used when an invocation is queued
    fn clone_boxed(&self) -> Box<dyn Argument>;

    /// Rust type name of the concrete value
    fn type_name(&self) -> &'static str;

    /// Serializes the value for a transport collaborator
    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error>;
}

impl<T> Argument for T
where
    T: Any + Send + Sync + Clone + fmt::Debug + Serialize,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_boxed(&self) -> Box<dyn Argument> {
        Box::new(self.clone())
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl dyn Argument {
    /// Returns true if the concrete type is `T`
    pub fn is<T: Any>(&self) -> bool {
        self.as_any().is::<T>()
    }

    /// Borrows the concrete value
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Mutably borrows the concrete value
    pub fn downcast_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }
}

/// Describes the argument type a command expects
///
/// Used for compatibility checks when connecting and invoking, and as a
/// serialization hint. Never carries a value.
#[derive(Debug, Clone, Copy)]
pub struct ArgumentPrototype {
    type_id: TypeId,
    type_name: &'static str,
}

impl ArgumentPrototype {
    /// Prototype for type `T`
    pub fn of<T: Argument>() -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Rust type name of the prototype
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns true if `argument` has the prototype's type
    pub fn matches(&self, argument: &dyn Argument) -> bool {
        argument.as_any().type_id() == self.type_id
    }
}

impl PartialEq for ArgumentPrototype {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ArgumentPrototype {}

impl fmt::Display for ArgumentPrototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name)
    }
}
