//! # Component Registry
//!
//! This crate implements the registry tree kept by the global component
//! manager: process → component → provided/required interface → connections.
//!
//! ## Philosophy
//!
//! Unlike a flat service table, every name is only unique inside its parent
//! scope. Lookups are by name; an interface is addressed by its
//! [`InterfaceId`] triple. The registry has no locking of its own; the
//! global component manager mutates it under its connection-change lock.

use core_types::{ConnectionId, ErrorKind, InterfaceId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Which side of a connection an interface is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterfaceRole {
    Provided,
    Required,
}

impl fmt::Display for InterfaceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceRole::Provided => write!(f, "provided"),
            InterfaceRole::Required => write!(f, "required"),
        }
    }
}

/// Error types for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Process already registered: {0}")]
    ProcessAlreadyRegistered(String),

    #[error("Component already registered: {process}:{component}")]
    ComponentAlreadyRegistered { process: String, component: String },

    #[error("{role} interface already registered: {id}")]
    InterfaceAlreadyRegistered { id: InterfaceId, role: InterfaceRole },

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Component not found: {process}:{component}")]
    ComponentNotFound { process: String, component: String },

    #[error("{role} interface not found: {id}")]
    InterfaceNotFound { id: InterfaceId, role: InterfaceRole },
}

impl RegistryError {
    /// Maps the error onto the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::ProcessAlreadyRegistered(_)
            | RegistryError::ComponentAlreadyRegistered { .. }
            | RegistryError::InterfaceAlreadyRegistered { .. } => ErrorKind::NameConflict,
            RegistryError::ProcessNotFound(_)
            | RegistryError::ComponentNotFound { .. }
            | RegistryError::InterfaceNotFound { .. } => ErrorKind::NotFound,
        }
    }
}

/// Registry record of one interface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceEntry {
    is_proxy: bool,
    connections: Vec<ConnectionId>,
}

impl InterfaceEntry {
    /// True if the interface belongs to a network proxy component
    pub fn is_proxy(&self) -> bool {
        self.is_proxy
    }

    /// Connections involving this interface, oldest first
    pub fn connections(&self) -> &[ConnectionId] {
        &self.connections
    }

    pub fn is_connected(&self) -> bool {
        !self.connections.is_empty()
    }

    fn add_connection(&mut self, connection: ConnectionId) -> bool {
        if self.connections.contains(&connection) {
            return false;
        }
        self.connections.push(connection);
        true
    }

    fn remove_connection(&mut self, connection: ConnectionId) -> bool {
        let before = self.connections.len();
        self.connections.retain(|existing| *existing != connection);
        self.connections.len() != before
    }
}

/// Registry record of one component
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentEntry {
    provided: BTreeMap<String, InterfaceEntry>,
    required: BTreeMap<String, InterfaceEntry>,
}

impl ComponentEntry {
    fn interfaces(&self, role: InterfaceRole) -> &BTreeMap<String, InterfaceEntry> {
        match role {
            InterfaceRole::Provided => &self.provided,
            InterfaceRole::Required => &self.required,
        }
    }

    fn interfaces_mut(&mut self, role: InterfaceRole) -> &mut BTreeMap<String, InterfaceEntry> {
        match role {
            InterfaceRole::Provided => &mut self.provided,
            InterfaceRole::Required => &mut self.required,
        }
    }

    fn connections(&self) -> Vec<ConnectionId> {
        self.provided
            .values()
            .chain(self.required.values())
            .flat_map(|entry| entry.connections.iter().copied())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct ProcessEntry {
    components: BTreeMap<String, ComponentEntry>,
}

/// Registry of every process, component and interface in the system
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    processes: BTreeMap<String, ProcessEntry>,
}

impl ComponentRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a process
    pub fn add_process(&mut self, process: &str) -> Result<(), RegistryError> {
        if self.processes.contains_key(process) {
            return Err(RegistryError::ProcessAlreadyRegistered(process.to_string()));
        }
        self.processes
            .insert(process.to_string(), ProcessEntry::default());
        Ok(())
    }

    pub fn find_process(&self, process: &str) -> bool {
        self.processes.contains_key(process)
    }

    /// Unregisters a process and everything below it
    pub fn remove_process(&mut self, process: &str) -> Result<(), RegistryError> {
        self.processes
            .remove(process)
            .map(|_| ())
            .ok_or_else(|| RegistryError::ProcessNotFound(process.to_string()))
    }

    /// Registers a component under an existing process
    pub fn add_component(&mut self, process: &str, component: &str) -> Result<(), RegistryError> {
        let entry = self.process_mut(process)?;
        if entry.components.contains_key(component) {
            return Err(RegistryError::ComponentAlreadyRegistered {
                process: process.to_string(),
                component: component.to_string(),
            });
        }
        entry
            .components
            .insert(component.to_string(), ComponentEntry::default());
        Ok(())
    }

    pub fn find_component(&self, process: &str, component: &str) -> bool {
        self.component(process, component).is_ok()
    }

    /// Unregisters a component and its interfaces
    pub fn remove_component(&mut self, process: &str, component: &str) -> Result<(), RegistryError> {
        self.process_mut(process)?
            .components
            .remove(component)
            .map(|_| ())
            .ok_or_else(|| RegistryError::ComponentNotFound {
                process: process.to_string(),
                component: component.to_string(),
            })
    }

    /// Registers an interface under an existing component
    pub fn add_interface(
        &mut self,
        id: &InterfaceId,
        role: InterfaceRole,
        is_proxy: bool,
    ) -> Result<(), RegistryError> {
        let interfaces = self
            .component_mut(&id.process, &id.component)?
            .interfaces_mut(role);
        if interfaces.contains_key(&id.interface) {
            return Err(RegistryError::InterfaceAlreadyRegistered {
                id: id.clone(),
                role,
            });
        }
        interfaces.insert(
            id.interface.clone(),
            InterfaceEntry {
                is_proxy,
                connections: Vec::new(),
            },
        );
        Ok(())
    }

    pub fn find_interface(&self, id: &InterfaceId, role: InterfaceRole) -> bool {
        self.interface(id, role).is_ok()
    }

    /// Unregisters an interface
    pub fn remove_interface(
        &mut self,
        id: &InterfaceId,
        role: InterfaceRole,
    ) -> Result<(), RegistryError> {
        self.component_mut(&id.process, &id.component)?
            .interfaces_mut(role)
            .remove(&id.interface)
            .map(|_| ())
            .ok_or_else(|| RegistryError::InterfaceNotFound {
                id: id.clone(),
                role,
            })
    }

    /// Returns the record of an interface
    pub fn interface(
        &self,
        id: &InterfaceId,
        role: InterfaceRole,
    ) -> Result<&InterfaceEntry, RegistryError> {
        self.component(&id.process, &id.component)?
            .interfaces(role)
            .get(&id.interface)
            .ok_or_else(|| RegistryError::InterfaceNotFound {
                id: id.clone(),
                role,
            })
    }

    /// Records `connection` on an interface; false if already recorded
    pub fn add_connection(
        &mut self,
        id: &InterfaceId,
        role: InterfaceRole,
        connection: ConnectionId,
    ) -> Result<bool, RegistryError> {
        Ok(self.interface_mut(id, role)?.add_connection(connection))
    }

    /// Forgets `connection` on an interface; false if it was not recorded
    pub fn remove_connection(
        &mut self,
        id: &InterfaceId,
        role: InterfaceRole,
        connection: ConnectionId,
    ) -> Result<bool, RegistryError> {
        Ok(self.interface_mut(id, role)?.remove_connection(connection))
    }

    /// Every connection recorded on the interfaces of a process
    pub fn connections_of_process(&self, process: &str) -> Result<Vec<ConnectionId>, RegistryError> {
        let mut connections: Vec<ConnectionId> = self
            .process(process)?
            .components
            .values()
            .flat_map(|component| component.connections())
            .collect();
        connections.sort();
        connections.dedup();
        Ok(connections)
    }

    /// Every connection recorded on the interfaces of a component
    pub fn connections_of_component(
        &self,
        process: &str,
        component: &str,
    ) -> Result<Vec<ConnectionId>, RegistryError> {
        let mut connections = self.component(process, component)?.connections();
        connections.sort();
        connections.dedup();
        Ok(connections)
    }

    pub fn names_of_processes(&self) -> Vec<String> {
        self.processes.keys().cloned().collect()
    }

    pub fn names_of_components(&self, process: &str) -> Result<Vec<String>, RegistryError> {
        Ok(self.process(process)?.components.keys().cloned().collect())
    }

    pub fn names_of_interfaces(
        &self,
        process: &str,
        component: &str,
        role: InterfaceRole,
    ) -> Result<Vec<String>, RegistryError> {
        Ok(self
            .component(process, component)?
            .interfaces(role)
            .keys()
            .cloned()
            .collect())
    }

    /// Number of provided plus required interfaces of a component
    pub fn number_of_interfaces(&self, process: &str, component: &str) -> Result<usize, RegistryError> {
        let entry = self.component(process, component)?;
        Ok(entry.provided.len() + entry.required.len())
    }

    /// Returns the number of registered processes
    pub fn process_count(&self) -> usize {
        self.processes.len()
    }

    fn process(&self, process: &str) -> Result<&ProcessEntry, RegistryError> {
        self.processes
            .get(process)
            .ok_or_else(|| RegistryError::ProcessNotFound(process.to_string()))
    }

    fn process_mut(&mut self, process: &str) -> Result<&mut ProcessEntry, RegistryError> {
        self.processes
            .get_mut(process)
            .ok_or_else(|| RegistryError::ProcessNotFound(process.to_string()))
    }

    fn component(&self, process: &str, component: &str) -> Result<&ComponentEntry, RegistryError> {
        self.process(process)?
            .components
            .get(component)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                process: process.to_string(),
                component: component.to_string(),
            })
    }

    fn component_mut(
        &mut self,
        process: &str,
        component: &str,
    ) -> Result<&mut ComponentEntry, RegistryError> {
        self.process_mut(process)?
            .components
            .get_mut(component)
            .ok_or_else(|| RegistryError::ComponentNotFound {
                process: process.to_string(),
                component: component.to_string(),
            })
    }

    fn interface_mut(
        &mut self,
        id: &InterfaceId,
        role: InterfaceRole,
    ) -> Result<&mut InterfaceEntry, RegistryError> {
        self.component_mut(&id.process, &id.component)?
            .interfaces_mut(role)
            .get_mut(&id.interface)
            .ok_or_else(|| RegistryError::InterfaceNotFound {
                id: id.clone(),
                role,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> ComponentRegistry {
        let mut registry = ComponentRegistry::new();
        registry.add_process("P1").unwrap();
        registry.add_component("P1", "C1").unwrap();
        registry
            .add_interface(
                &InterfaceId::new("P1", "C1", "Server"),
                InterfaceRole::Provided,
                false,
            )
            .unwrap();
        registry
    }

    #[test]
    fn test_registry_creation() {
        let registry = ComponentRegistry::new();
        assert_eq!(registry.process_count(), 0);
        assert!(registry.names_of_processes().is_empty());
    }

    #[test]
    fn test_duplicate_process() {
        let mut registry = populated();
        let result = registry.add_process("P1");
        assert_eq!(
            result,
            Err(RegistryError::ProcessAlreadyRegistered("P1".to_string()))
        );
        assert_eq!(registry.process_count(), 1);
    }

    #[test]
    fn test_duplicate_component_leaves_existing_untouched() {
        let mut registry = populated();
        let before = registry.clone();
        let err = registry.add_component("P1", "C1").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);
        assert_eq!(registry.names_of_components("P1"), before.names_of_components("P1"));
        assert!(registry.find_interface(
            &InterfaceId::new("P1", "C1", "Server"),
            InterfaceRole::Provided
        ));
    }

    #[test]
    fn test_component_requires_process() {
        let mut registry = ComponentRegistry::new();
        assert_eq!(
            registry.add_component("Missing", "C1"),
            Err(RegistryError::ProcessNotFound("Missing".to_string()))
        );
    }

    #[test]
    fn test_same_name_in_different_scopes() {
        let mut registry = populated();
        registry.add_process("P2").unwrap();
        registry.add_component("P2", "C1").unwrap();
        let id = InterfaceId::new("P1", "C1", "Server");
        registry
            .add_interface(&id, InterfaceRole::Required, false)
            .unwrap();
        assert!(registry.find_interface(&id, InterfaceRole::Provided));
        assert!(registry.find_interface(&id, InterfaceRole::Required));
        assert!(registry.find_component("P2", "C1"));
    }

    #[test]
    fn test_duplicate_interface() {
        let mut registry = populated();
        let id = InterfaceId::new("P1", "C1", "Server");
        let err = registry
            .add_interface(&id, InterfaceRole::Provided, true)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);
        assert!(!registry
            .interface(&id, InterfaceRole::Provided)
            .unwrap()
            .is_proxy());
    }

    #[test]
    fn test_connection_bookkeeping() {
        let mut registry = populated();
        let id = InterfaceId::new("P1", "C1", "Server");
        let first = ConnectionId::FIRST;
        let second = ConnectionId::from_raw(2);

        assert!(registry
            .add_connection(&id, InterfaceRole::Provided, first)
            .unwrap());
        assert!(!registry
            .add_connection(&id, InterfaceRole::Provided, first)
            .unwrap());
        registry
            .add_connection(&id, InterfaceRole::Provided, second)
            .unwrap();

        let entry = registry.interface(&id, InterfaceRole::Provided).unwrap();
        assert_eq!(entry.connections(), &[first, second]);
        assert_eq!(registry.connections_of_process("P1").unwrap(), vec![first, second]);

        assert!(registry
            .remove_connection(&id, InterfaceRole::Provided, first)
            .unwrap());
        assert_eq!(
            registry.connections_of_component("P1", "C1").unwrap(),
            vec![second]
        );
    }

    #[test]
    fn test_names_and_counts() {
        let mut registry = populated();
        registry
            .add_interface(
                &InterfaceId::new("P1", "C1", "Client"),
                InterfaceRole::Required,
                false,
            )
            .unwrap();
        assert_eq!(registry.names_of_processes(), vec!["P1"]);
        assert_eq!(registry.names_of_components("P1").unwrap(), vec!["C1"]);
        assert_eq!(
            registry
                .names_of_interfaces("P1", "C1", InterfaceRole::Required)
                .unwrap(),
            vec!["Client"]
        );
        assert_eq!(registry.number_of_interfaces("P1", "C1").unwrap(), 2);
    }

    #[test]
    fn test_remove_cascades() {
        let mut registry = populated();
        registry.remove_component("P1", "C1").unwrap();
        assert!(!registry.find_component("P1", "C1"));
        assert!(registry.find_process("P1"));

        registry.remove_process("P1").unwrap();
        assert!(!registry.find_process("P1"));
        assert_eq!(
            registry.remove_process("P1"),
            Err(RegistryError::ProcessNotFound("P1".to_string()))
        );
    }
}
