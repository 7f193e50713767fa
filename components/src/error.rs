//! Component error types

use core_types::ErrorKind;
use interfaces::InterfaceError;
use lifecycle::LifecycleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComponentError {
    #[error("Component '{component}' already has an interface named '{interface}'")]
    DuplicateInterface {
        component: String,
        interface: String,
    },

    #[error("Interface '{interface}' not found in component '{component}'")]
    InterfaceNotFound {
        component: String,
        interface: String,
    },

    #[error("Task for component '{0}' was already created")]
    AlreadyCreated(String),

    #[error("Failed to spawn thread for component '{component}': {source}")]
    Spawn {
        component: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Task thread of component '{0}' panicked")]
    Panicked(String),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Interface(#[from] InterfaceError),
}

impl ComponentError {
    /// Maps the error onto the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ComponentError::DuplicateInterface { .. } => ErrorKind::NameConflict,
            ComponentError::InterfaceNotFound { .. } => ErrorKind::NotFound,
            ComponentError::AlreadyCreated(_) | ComponentError::Panicked(_) => {
                ErrorKind::PolicyViolation
            }
            ComponentError::Spawn { .. } => ErrorKind::Io,
            ComponentError::Lifecycle(LifecycleError::Timeout) => ErrorKind::Timeout,
            ComponentError::Lifecycle(LifecycleError::InvalidTransition { .. }) => {
                ErrorKind::PolicyViolation
            }
            ComponentError::Interface(err) => err.kind(),
        }
    }
}
