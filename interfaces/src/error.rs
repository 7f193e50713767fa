//! Interface error types

use core_types::ErrorKind;
use ipc::IpcError;
use thiserror::Error;

/// Errors raised by provided and required interfaces
#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("Interface '{interface}' already has a command named '{name}'")]
    DuplicateCommand { interface: String, name: String },

    #[error("Interface '{interface}' already has an event named '{name}'")]
    DuplicateEvent { interface: String, name: String },

    #[error("Interface '{interface}' already has a function named '{name}'")]
    DuplicateFunction { interface: String, name: String },

    #[error("Interface '{interface}' already has an event handler named '{name}'")]
    DuplicateEventHandler { interface: String, name: String },

    #[error("Interface '{interface}' already has an end user named '{user}'")]
    DuplicateUser { interface: String, user: String },

    #[error("Command '{name}' not found in interface '{interface}'")]
    CommandNotFound { interface: String, name: String },

    #[error("Event '{name}' not found in interface '{interface}'")]
    EventNotFound { interface: String, name: String },

    #[error("End user '{user}' not found in interface '{interface}'")]
    UserNotFound { interface: String, user: String },

    #[error("Interface '{interface}' already has end users and can no longer be modified")]
    FactoryFrozen { interface: String },

    #[error("'{operation}' is only valid on an end-user interface, '{interface}' is a factory")]
    NotEndUser {
        interface: String,
        operation: &'static str,
    },

    #[error("'{operation}' is only valid on a factory interface, '{interface}' is an end user")]
    NotFactory {
        interface: String,
        operation: &'static str,
    },

    #[error("Required interface '{interface}' is already connected to '{provided}'")]
    AlreadyBound { interface: String, provided: String },

    #[error("Required interface '{interface}' is not connected")]
    NotBound { interface: String },

    #[error("Function '{function}' is not connected")]
    Unbound { function: String },

    #[error("Function '{function}' expects {expected}, provided command is {actual}")]
    Incompatible {
        function: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    Ipc(#[from] IpcError),
}

impl InterfaceError {
    /// Maps the error onto the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            InterfaceError::DuplicateCommand { .. }
            | InterfaceError::DuplicateEvent { .. }
            | InterfaceError::DuplicateFunction { .. }
            | InterfaceError::DuplicateEventHandler { .. }
            | InterfaceError::DuplicateUser { .. } => ErrorKind::NameConflict,
            InterfaceError::CommandNotFound { .. }
            | InterfaceError::EventNotFound { .. }
            | InterfaceError::UserNotFound { .. } => ErrorKind::NotFound,
            InterfaceError::FactoryFrozen { .. }
            | InterfaceError::NotEndUser { .. }
            | InterfaceError::NotFactory { .. } => ErrorKind::PolicyViolation,
            InterfaceError::AlreadyBound { .. } => ErrorKind::AlreadyConnected,
            InterfaceError::NotBound { .. } => ErrorKind::NotConnected,
            InterfaceError::Unbound { .. } => ErrorKind::Unbound,
            InterfaceError::Incompatible { .. } => ErrorKind::TypeMismatch,
            InterfaceError::Ipc(err) => err.kind(),
        }
    }
}
