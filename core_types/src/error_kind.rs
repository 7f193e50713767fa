//! Error taxonomy shared by all runtime crates
//!
//! Each crate keeps its own error enum; `ErrorKind` is the common
//! classification callers match on without depending on every crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a recoverable runtime error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Duplicate process, component, interface, command or event name
    NameConflict,
    /// Lookup of a name that does not exist
    NotFound,
    /// The client/server pair already has a pending or established connection
    AlreadyConnected,
    /// Disconnect of a pair that is not connected
    NotConnected,
    /// Mailbox full; the invocation was dropped
    QueueOverflow,
    /// A timeout-bounded operation expired
    Timeout,
    /// Operation not allowed in the current role or state
    PolicyViolation,
    /// Argument does not match the command's prototype
    TypeMismatch,
    /// Function handle invoked before being connected
    Unbound,
    /// Operating system or file failure (thread spawn, config file)
    Io,
}

impl ErrorKind {
    /// Returns true for conditions that concern connection state
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::AlreadyConnected | ErrorKind::NotConnected | ErrorKind::Unbound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::NameConflict => "name conflict",
            ErrorKind::NotFound => "not found",
            ErrorKind::AlreadyConnected => "already connected",
            ErrorKind::NotConnected => "not connected",
            ErrorKind::QueueOverflow => "queue overflow",
            ErrorKind::Timeout => "timeout",
            ErrorKind::PolicyViolation => "policy violation",
            ErrorKind::TypeMismatch => "type mismatch",
            ErrorKind::Unbound => "unbound",
            ErrorKind::Io => "i/o",
        };
        write!(f, "{}", label)
    }
}
