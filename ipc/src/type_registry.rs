//! Name to factory map for argument types
//!
//! A transport collaborator receives a type name and a JSON payload and
//! needs a concrete argument back. Types are registered explicitly; there
//! is no global registration.

use crate::{Argument, ArgumentPrototype, IpcError};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

type Factory = Box<dyn Fn() -> Box<dyn Argument> + Send + Sync>;
type Decoder =
    Box<dyn Fn(serde_json::Value) -> Result<Box<dyn Argument>, serde_json::Error> + Send + Sync>;

struct TypeEntry {
    prototype: ArgumentPrototype,
    create: Factory,
    decode: Decoder,
}

/// Registry of argument types keyed by name
#[derive(Default)]
pub struct TypeRegistry {
    entries: HashMap<String, TypeEntry>,
}

impl TypeRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `name`
    pub fn register<T>(&mut self, name: impl Into<String>) -> Result<(), IpcError>
    where
        T: Argument + Default + DeserializeOwned,
    {
        let name = name.into();
        if self.entries.contains_key(&name) {
            return Err(IpcError::DuplicateType(name));
        }
        let entry = TypeEntry {
            prototype: ArgumentPrototype::of::<T>(),
            create: Box::new(|| Box::new(T::default()) as Box<dyn Argument>),
            decode: Box::new(
                |value: serde_json::Value| -> Result<Box<dyn Argument>, serde_json::Error> {
                    let decoded: T = serde_json::from_value(value)?;
                    Ok(Box::new(decoded))
                },
            ),
        };
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Creates a default-initialized argument of the named type
    pub fn create(&self, name: &str) -> Result<Box<dyn Argument>, IpcError> {
        let entry = self.lookup(name)?;
        Ok((entry.create)())
    }

    /// Reconstructs an argument of the named type from JSON
    pub fn from_json(
        &self,
        name: &str,
        value: serde_json::Value,
    ) -> Result<Box<dyn Argument>, IpcError> {
        let entry = self.lookup(name)?;
        (entry.decode)(value).map_err(|source| IpcError::Decode {
            type_name: name.to_string(),
            source,
        })
    }

    /// Returns the prototype registered under `name`
    pub fn prototype(&self, name: &str) -> Option<ArgumentPrototype> {
        self.entries.get(name).map(|entry| entry.prototype)
    }

    /// Returns the registered name for a prototype, if any
    pub fn name_of(&self, prototype: &ArgumentPrototype) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, entry)| entry.prototype == *prototype)
            .map(|(name, _)| name.as_str())
    }

    /// Returns true if `name` is registered
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Returns the registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.keys().cloned().collect();
        names.sort();
        names
    }

    fn lookup(&self, name: &str) -> Result<&TypeEntry, IpcError> {
        self.entries
            .get(name)
            .ok_or_else(|| IpcError::UnknownType(name.to_string()))
    }
}

impl std::fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.names())
            .finish()
    }
}
