//! Local component manager error types

use components::ComponentError;
use core_types::ErrorKind;
use interfaces::InterfaceError;
use services_global_manager::{GlobalManagerError, PeerError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LocalManagerError {
    #[error("Component already added: {0}")]
    ComponentAlreadyAdded(String),

    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Component '{component}' belongs to process '{owner}', not '{process}'")]
    ForeignComponent {
        component: String,
        owner: String,
        process: String,
    },

    #[error("Required interface {component}.{interface} is not wired")]
    NotWired { component: String, interface: String },

    #[error("'{name}' not found in required interface {component}.{interface}")]
    HandleNotFound {
        component: String,
        interface: String,
        name: String,
    },

    #[error(transparent)]
    Component(#[from] ComponentError),

    #[error(transparent)]
    Interface(#[from] InterfaceError),

    #[error(transparent)]
    Global(#[from] GlobalManagerError),
}

impl LocalManagerError {
    /// Maps the error onto the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocalManagerError::ComponentAlreadyAdded(_) => ErrorKind::NameConflict,
            LocalManagerError::ComponentNotFound(_) | LocalManagerError::HandleNotFound { .. } => {
                ErrorKind::NotFound
            }
            LocalManagerError::ForeignComponent { .. } => ErrorKind::PolicyViolation,
            LocalManagerError::NotWired { .. } => ErrorKind::NotConnected,
            LocalManagerError::Component(err) => err.kind(),
            LocalManagerError::Interface(err) => err.kind(),
            LocalManagerError::Global(err) => err.kind(),
        }
    }
}

impl From<LocalManagerError> for PeerError {
    fn from(err: LocalManagerError) -> Self {
        PeerError::new(err.kind(), err.to_string())
    }
}
