//! Interface triples, connection descriptions and naming conventions

use serde::{Deserialize, Serialize};
use std::fmt;

const PROXY_SUFFIX: &str = "Proxy";

/// Globally unique identity of an interface
///
/// Unlike a bare interface name (unique only within its component), the
/// triple is unique across the whole system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterfaceId {
    pub process: String,
    pub component: String,
    pub interface: String,
}

impl InterfaceId {
    /// Creates an interface triple
    pub fn new(
        process: impl Into<String>,
        component: impl Into<String>,
        interface: impl Into<String>,
    ) -> Self {
        Self {
            process: process.into(),
            component: component.into(),
            interface: interface.into(),
        }
    }

    /// Returns the `process:component:interface` rendering used in logs
    pub fn uid(&self) -> String {
        format!("{}:{}:{}", self.process, self.component, self.interface)
    }
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.process, self.component, self.interface)
    }
}

/// Description of a connection: which required interface talks to which
/// provided interface
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionDescription {
    /// Required (client) side
    pub client: InterfaceId,
    /// Provided (server) side
    pub server: InterfaceId,
}

impl ConnectionDescription {
    /// Creates a description from both triples
    pub fn new(client: InterfaceId, server: InterfaceId) -> Self {
        Self { client, server }
    }

    /// Returns true if client and server live in the same process
    pub fn is_local(&self) -> bool {
        self.client.process == self.server.process
    }

    /// Returns the same endpoints with client and server exchanged
    pub fn swapped(&self) -> Self {
        Self {
            client: self.server.clone(),
            server: self.client.clone(),
        }
    }
}

impl fmt::Display for ConnectionDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" - \"{}\"", self.client, self.server)
    }
}

/// Returns true if the component name designates a proxy component
pub fn is_proxy_component(component: &str) -> bool {
    component.len() > PROXY_SUFFIX.len() && component.ends_with(PROXY_SUFFIX)
}

/// Name of the proxy that stands for `component` of `process` in a peer process
pub fn component_proxy_name(process: &str, component: &str) -> String {
    if is_proxy_component(component) {
        return component.to_string();
    }
    format!("{}.{}{}", process, component, PROXY_SUFFIX)
}

/// Name of the end-user copy of a provided interface created for `user`
pub fn end_user_interface_name(interface: &str, user: &str) -> String {
    format!("{}[{}]", interface, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interface_uid() {
        let id = InterfaceId::new("P1", "C1", "Server");
        assert_eq!(id.uid(), "P1:C1:Server");
        assert_eq!(format!("{}", id), "P1:C1:Server");
    }

    #[test]
    fn test_description_locality() {
        let local = ConnectionDescription::new(
            InterfaceId::new("P1", "C2", "Client"),
            InterfaceId::new("P1", "C1", "Server"),
        );
        assert!(local.is_local());

        let remote = ConnectionDescription::new(
            InterfaceId::new("P2", "C2", "Client"),
            InterfaceId::new("P1", "C1", "Server"),
        );
        assert!(!remote.is_local());
    }

    #[test]
    fn test_description_swapped() {
        let description = ConnectionDescription::new(
            InterfaceId::new("P2", "C2", "Client"),
            InterfaceId::new("P1", "C1", "Server"),
        );
        let swapped = description.swapped();
        assert_eq!(swapped.client, description.server);
        assert_eq!(swapped.server, description.client);
    }

    #[test]
    fn test_proxy_names() {
        assert_eq!(component_proxy_name("P1", "C1"), "P1.C1Proxy");
        assert!(is_proxy_component("P1.C1Proxy"));
        assert!(!is_proxy_component("Proxy"));
        assert!(!is_proxy_component("C1"));
        assert_eq!(component_proxy_name("P1", "P2.C1Proxy"), "P2.C1Proxy");
    }

    #[test]
    fn test_end_user_interface_name() {
        assert_eq!(end_user_interface_name("Server", "C2"), "Server[C2]");
    }

    #[test]
    fn test_description_serde_roundtrip() {
        let description = ConnectionDescription::new(
            InterfaceId::new("P2", "C2", "Client"),
            InterfaceId::new("P1", "C1", "Server"),
        );
        let json = serde_json::to_string(&description).unwrap();
        let decoded: ConnectionDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, description);
    }
}
