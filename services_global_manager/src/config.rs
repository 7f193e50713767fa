//! Global component manager configuration

use core_types::ConnectionDescription;
use std::time::Duration;

/// Pending cross-process connections expire after this long by default
pub const DEFAULT_NETWORK_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables of the global component manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalManagerConfig {
    /// How long a cross-process connection may stay pending
    pub network_connect_timeout: Duration,
    /// How long a same-process connection may stay pending; `None` never expires
    pub local_connect_timeout: Option<Duration>,
}

impl Default for GlobalManagerConfig {
    fn default() -> Self {
        Self {
            network_connect_timeout: DEFAULT_NETWORK_CONNECT_TIMEOUT,
            local_connect_timeout: None,
        }
    }
}

impl GlobalManagerConfig {
    /// Timeout applying to a new connection with this description
    pub fn connect_timeout(&self, description: &ConnectionDescription) -> Option<Duration> {
        if description.is_local() {
            self.local_connect_timeout
        } else {
            Some(self.network_connect_timeout)
        }
    }
}
