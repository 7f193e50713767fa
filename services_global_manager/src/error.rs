//! Global component manager error types

use crate::PeerError;
use core_types::{ConnectionDescription, ConnectionId, ErrorKind, InterfaceId};
use services_registry::{InterfaceRole, RegistryError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GlobalManagerError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("No {role} interface found: \"{id}\", available: {available:?}")]
    NoSuchInterface {
        id: InterfaceId,
        role: InterfaceRole,
        available: Vec<String>,
    },

    #[error("Already connected interfaces: {0}")]
    AlreadyConnected(ConnectionDescription),

    #[error("Interfaces are not connected: {0}")]
    NotConnected(ConnectionDescription),

    #[error("Invalid connection id: {0}")]
    ConnectionNotFound(ConnectionId),

    #[error("{0} is already confirmed")]
    AlreadyConfirmed(ConnectionId),

    #[error("{0} timed out before it was confirmed")]
    ConfirmTimedOut(ConnectionId),

    #[error("Connection ids exhausted")]
    IdsExhausted,

    #[error("No proxy access info for {0}")]
    NoProxyAccessInfo(String),

    #[error("Local wiring of {description} failed: {source}")]
    LocalWiring {
        description: ConnectionDescription,
        #[source]
        source: PeerError,
    },

    #[error("Failed to spawn timeout sweeper: {0}")]
    Spawn(#[source] std::io::Error),
}

impl GlobalManagerError {
    /// Maps the error onto the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            GlobalManagerError::Registry(err) => err.kind(),
            GlobalManagerError::NoSuchInterface { .. }
            | GlobalManagerError::ConnectionNotFound(_)
            | GlobalManagerError::NoProxyAccessInfo(_) => ErrorKind::NotFound,
            GlobalManagerError::AlreadyConnected(_) => ErrorKind::AlreadyConnected,
            GlobalManagerError::NotConnected(_) => ErrorKind::NotConnected,
            GlobalManagerError::AlreadyConfirmed(_) | GlobalManagerError::IdsExhausted => {
                ErrorKind::PolicyViolation
            }
            GlobalManagerError::ConfirmTimedOut(_) => ErrorKind::Timeout,
            GlobalManagerError::LocalWiring { source, .. } => source.kind(),
            GlobalManagerError::Spawn(_) => ErrorKind::Io,
        }
    }
}
