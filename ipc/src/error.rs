//! IPC error types

use crate::SignatureClass;
use core_types::{ErrorKind, MailboxId};
use thiserror::Error;

/// Errors raised while registering or invoking commands
#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Mailbox {mailbox} full ({capacity} pending), invocation of '{command}' dropped")]
    QueueOverflow {
        mailbox: MailboxId,
        capacity: usize,
        command: String,
    },

    #[error("Command '{command}' expects argument {expected}, got {actual}")]
    TypeMismatch {
        command: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Command '{command}' has signature {actual}, invoked as {attempted}")]
    SignatureMismatch {
        command: String,
        actual: SignatureClass,
        attempted: SignatureClass,
    },

    #[error("{signature} command '{command}' can not be queued")]
    NotQueueable {
        command: String,
        signature: SignatureClass,
    },

    #[error("Queued command '{command}' is not bound to a mailbox")]
    NoMailbox { command: String },

    #[error("Blocking call to '{command}' timed out")]
    Timeout { command: String },

    #[error("Type '{0}' already registered")]
    DuplicateType(String),

    #[error("Type '{0}' not registered")]
    UnknownType(String),

    #[error("Failed to decode '{type_name}': {source}")]
    Decode {
        type_name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl IpcError {
    /// Maps the error onto the shared taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            IpcError::QueueOverflow { .. } => ErrorKind::QueueOverflow,
            IpcError::TypeMismatch { .. }
            | IpcError::SignatureMismatch { .. }
            | IpcError::Decode { .. } => ErrorKind::TypeMismatch,
            IpcError::NotQueueable { .. } | IpcError::NoMailbox { .. } => {
                ErrorKind::PolicyViolation
            }
            IpcError::Timeout { .. } => ErrorKind::Timeout,
            IpcError::DuplicateType(_) => ErrorKind::NameConflict,
            IpcError::UnknownType(_) => ErrorKind::NotFound,
        }
    }
}
