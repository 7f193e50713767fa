//! Connection elements
//!
//! The global component manager keeps one element per connection that is
//! pending or established. Removed connections leave no trace.

use core_types::{ConnectionDescription, ConnectionId, InterfaceId};
use lifecycle::{Deadline, Instant};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Externally visible state of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Pending,
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Pending => write!(f, "pending"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Pending { expires_at: Option<Deadline> },
    Connected,
}

/// Bookkeeping record of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionElement {
    id: ConnectionId,
    requester: String,
    description: ConnectionDescription,
    state: ConnectionState,
    created_at: Instant,
    proxy_access_info: Option<String>,
}

impl ConnectionElement {
    pub(crate) fn new(
        id: ConnectionId,
        requester: impl Into<String>,
        description: ConnectionDescription,
        created_at: Instant,
        expires_at: Option<Deadline>,
    ) -> Self {
        Self {
            id,
            requester: requester.into(),
            description,
            state: ConnectionState::Pending { expires_at },
            created_at,
            proxy_access_info: None,
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Process that asked for the connection
    pub fn requester(&self) -> &str {
        &self.requester
    }

    pub fn description(&self) -> &ConnectionDescription {
        &self.description
    }

    pub fn client(&self) -> &InterfaceId {
        &self.description.client
    }

    pub fn server(&self) -> &InterfaceId {
        &self.description.server
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.state {
            ConnectionState::Pending { .. } => ConnectionStatus::Pending,
            ConnectionState::Connected => ConnectionStatus::Connected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Deadline of a pending connection, if it has one
    pub fn expires_at(&self) -> Option<Deadline> {
        match self.state {
            ConnectionState::Pending { expires_at } => expires_at,
            ConnectionState::Connected => None,
        }
    }

    /// True for a pending connection whose deadline has passed
    ///
    /// Connected elements never expire.
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at()
            .map(|deadline| deadline.has_passed(now))
            .unwrap_or(false)
    }

    pub fn proxy_access_info(&self) -> Option<&str> {
        self.proxy_access_info.as_deref()
    }

    /// Snapshot handed out to callers
    pub fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            id: self.id,
            requester: self.requester.clone(),
            client: self.description.client.clone(),
            server: self.description.server.clone(),
            status: self.status(),
        }
    }

    pub(crate) fn confirm(&mut self) {
        self.state = ConnectionState::Connected;
    }

    pub(crate) fn set_proxy_access_info(&mut self, info: String) {
        self.proxy_access_info = Some(info);
    }

    /// True if `id` is either endpoint
    pub fn involves(&self, id: &InterfaceId) -> bool {
        self.description.client == *id || self.description.server == *id
    }

    pub(crate) fn involves_component(&self, process: &str, component: &str) -> bool {
        [&self.description.client, &self.description.server]
            .iter()
            .any(|side| side.process == process && side.component == component)
    }

    pub(crate) fn involves_process(&self, process: &str) -> bool {
        self.description.client.process == process || self.description.server.process == process
    }
}

/// One entry of the connection list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub id: ConnectionId,
    pub requester: String,
    pub client: InterfaceId,
    pub server: InterfaceId,
    pub status: ConnectionStatus,
}

impl fmt::Display for ConnectionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \"{}\" - \"{}\" ({})",
            self.id, self.client, self.server, self.status
        )
    }
}
