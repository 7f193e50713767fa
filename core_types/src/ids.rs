//! Unique identifiers for runtime entities

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a connection between a required and a provided interface
///
/// Connection IDs are issued by the global component manager in strictly
/// increasing order and are never reused during its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// The first ID handed out by a fresh manager
    pub const FIRST: ConnectionId = ConnectionId(1);

    /// Creates a connection ID from its raw value
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Returns the next ID, or `None` once the ID space is exhausted
    pub fn next(&self) -> Option<ConnectionId> {
        self.0.checked_add(1).map(ConnectionId)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connection({})", self.0)
    }
}

/// Unique identifier for a mailbox
///
/// Every end-user interface owns exactly one mailbox; comparing mailbox IDs
/// is how callers check that two interfaces do not share a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MailboxId(Uuid);

impl MailboxId {
    /// Creates a new random mailbox ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a mailbox ID from a UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MailboxId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MailboxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mailbox({})", self.0)
    }
}
