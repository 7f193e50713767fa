//! Typed function handles of a required interface
//!
//! A handle is created when the required interface declares a function and
//! stays valid across connect and disconnect; only its target changes.

use crate::InterfaceError;
use ipc::{Argument, ArgumentPrototype, Command, ExecutionResult, SignatureClass};
use parking_lot::RwLock;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Shared slot behind every function handle
pub(crate) struct FunctionCell {
    name: String,
    signature: SignatureClass,
    argument: Option<ArgumentPrototype>,
    qualifier: Option<ArgumentPrototype>,
    target: RwLock<Option<Arc<Command>>>,
}

impl FunctionCell {
    pub(crate) fn new(
        name: String,
        signature: SignatureClass,
        argument: Option<ArgumentPrototype>,
        qualifier: Option<ArgumentPrototype>,
    ) -> Self {
        Self {
            name,
            signature,
            argument,
            qualifier,
            target: RwLock::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.target.read().is_some()
    }

    pub(crate) fn bind(&self, command: Arc<Command>) {
        *self.target.write() = Some(command);
    }

    pub(crate) fn unbind(&self) {
        *self.target.write() = None;
    }

    /// Checks the provided command against the declared signature
    pub(crate) fn check(&self, command: &Command) -> Result<(), InterfaceError> {
        if command.signature() == self.signature
            && command.argument_prototype() == self.argument
            && command.qualifier_prototype() == self.qualifier
        {
            Ok(())
        } else {
            Err(InterfaceError::Incompatible {
                function: self.name.clone(),
                expected: self.description(),
                actual: command.description(),
            })
        }
    }

    pub(crate) fn description(&self) -> String {
        match (self.qualifier, self.argument) {
            (Some(qualifier), Some(output)) => {
                format!("{}({} -> {})", self.signature, qualifier, output)
            }
            (None, Some(argument)) => format!("{}({})", self.signature, argument),
            _ => format!("{}()", self.signature),
        }
    }

    fn target(&self) -> Result<Arc<Command>, InterfaceError> {
        self.target
            .read()
            .clone()
            .ok_or_else(|| InterfaceError::Unbound {
                function: self.name.clone(),
            })
    }
}

impl fmt::Debug for FunctionCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("signature", &self.description())
            .field("bound", &self.is_bound())
            .finish()
    }
}

/// Handle to a void command
#[derive(Clone)]
pub struct FunctionVoid {
    cell: Arc<FunctionCell>,
}

impl FunctionVoid {
    pub(crate) fn new(cell: Arc<FunctionCell>) -> Self {
        Self { cell }
    }

    pub fn name(&self) -> &str {
        self.cell.name()
    }

    pub fn is_bound(&self) -> bool {
        self.cell.is_bound()
    }

    /// Invokes the connected command
    pub fn call(&self) -> Result<ExecutionResult, InterfaceError> {
        Ok(self.cell.target()?.execute_void()?)
    }

    /// Invokes the connected command and waits for it to execute
    pub fn call_blocking(&self, timeout: Duration) -> Result<(), InterfaceError> {
        Ok(self.cell.target()?.execute_void_blocking(timeout)?)
    }
}

/// Handle to a write command taking a `T`
pub struct FunctionWrite<T> {
    cell: Arc<FunctionCell>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Argument> FunctionWrite<T> {
    pub(crate) fn new(cell: Arc<FunctionCell>) -> Self {
        Self {
            cell,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.cell.name()
    }

    pub fn is_bound(&self) -> bool {
        self.cell.is_bound()
    }

    /// Invokes the connected command with `value`
    pub fn call(&self, value: &T) -> Result<ExecutionResult, InterfaceError> {
        Ok(self.cell.target()?.execute_write(value)?)
    }

    /// Invokes the connected command and waits for it to execute
    pub fn call_blocking(&self, value: &T, timeout: Duration) -> Result<(), InterfaceError> {
        Ok(self.cell.target()?.execute_write_blocking(value, timeout)?)
    }
}

impl<T> Clone for FunctionWrite<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            _marker: PhantomData,
        }
    }
}

/// Handle to a read command producing a `T`
pub struct FunctionRead<T> {
    cell: Arc<FunctionCell>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Argument> FunctionRead<T> {
    pub(crate) fn new(cell: Arc<FunctionCell>) -> Self {
        Self {
            cell,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.cell.name()
    }

    pub fn is_bound(&self) -> bool {
        self.cell.is_bound()
    }

    /// Fills `output` from the connected command
    pub fn call(&self, output: &mut T) -> Result<(), InterfaceError> {
        Ok(self.cell.target()?.execute_read(output)?)
    }

    /// Returns a freshly read value
    pub fn get(&self) -> Result<T, InterfaceError>
    where
        T: Default,
    {
        let mut output = T::default();
        self.call(&mut output)?;
        Ok(output)
    }
}

impl<T> Clone for FunctionRead<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            _marker: PhantomData,
        }
    }
}

/// Handle to a qualified read command mapping a `Q` to a `T`
pub struct FunctionQualifiedRead<Q, T> {
    cell: Arc<FunctionCell>,
    _marker: PhantomData<fn(&Q) -> T>,
}

impl<Q: Argument, T: Argument> FunctionQualifiedRead<Q, T> {
    pub(crate) fn new(cell: Arc<FunctionCell>) -> Self {
        Self {
            cell,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        self.cell.name()
    }

    pub fn is_bound(&self) -> bool {
        self.cell.is_bound()
    }

    /// Fills `output` from the connected command given `qualifier`
    pub fn call(&self, qualifier: &Q, output: &mut T) -> Result<(), InterfaceError> {
        Ok(self
            .cell
            .target()?
            .execute_qualified_read(qualifier, output)?)
    }

    /// Returns a freshly read value for `qualifier`
    pub fn get(&self, qualifier: &Q) -> Result<T, InterfaceError>
    where
        T: Default,
    {
        let mut output = T::default();
        self.call(qualifier, &mut output)?;
        Ok(output)
    }
}

impl<Q, T> Clone for FunctionQualifiedRead<Q, T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
            _marker: PhantomData,
        }
    }
}

impl fmt::Debug for FunctionVoid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.cell, f)
    }
}

impl<T> fmt::Debug for FunctionWrite<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.cell, f)
    }
}

impl<T> fmt::Debug for FunctionRead<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.cell, f)
    }
}

impl<Q, T> fmt::Debug for FunctionQualifiedRead<Q, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.cell, f)
    }
}
