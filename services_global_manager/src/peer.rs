//! Local component manager callbacks
//!
//! The global manager only keeps bookkeeping. Wiring interfaces together is
//! the job of the local manager of the process that owns them.

use core_types::{ConnectionDescription, ConnectionId, ErrorKind};
use thiserror::Error;

/// Failure reported by a local manager
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PeerError {
    kind: ErrorKind,
    message: String,
}

impl PeerError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A local component manager as seen by the global manager
///
/// Callbacks are never invoked while the global manager's lock is held, so
/// implementations may call back into the global manager.
pub trait LocalManagerPeer: Send + Sync {
    /// Wires a connection whose client and server both live in this process
    fn connect_local(
        &self,
        connection: ConnectionId,
        description: &ConnectionDescription,
    ) -> Result<(), PeerError>;

    /// Unwinds whatever wiring this process holds for a removed connection
    fn connection_removed(&self, connection: ConnectionId, description: &ConnectionDescription);
}
