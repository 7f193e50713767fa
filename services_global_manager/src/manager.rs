//! Global component manager
//!
//! Owns the registry tree and the connection elements behind a single
//! connection-change lock. Local managers are called only after that lock
//! has been released.

use crate::{
    ConnectionElement, ConnectionInfo, GlobalManagerConfig, GlobalManagerError, LocalManagerPeer,
};
use core_types::{ConnectionDescription, ConnectionId, InterfaceId};
use lifecycle::{Clock, Deadline, SystemClock};
use parking_lot::Mutex;
use services_registry::{ComponentRegistry, InterfaceRole, RegistryError};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};

struct GlobalState {
    registry: ComponentRegistry,
    connections: BTreeMap<ConnectionId, ConnectionElement>,
    /// `None` once every id has been handed out
    next_id: Option<ConnectionId>,
    peers: HashMap<String, Weak<dyn LocalManagerPeer>>,
}

/// A connection taken out under the lock, announced after it is released
struct Removal {
    element: ConnectionElement,
    peers: Vec<Arc<dyn LocalManagerPeer>>,
}

impl GlobalState {
    fn new() -> Self {
        Self {
            registry: ComponentRegistry::new(),
            connections: BTreeMap::new(),
            next_id: Some(ConnectionId::FIRST),
            peers: HashMap::new(),
        }
    }

    fn peer(&self, process: &str) -> Option<Arc<dyn LocalManagerPeer>> {
        self.peers.get(process).and_then(Weak::upgrade)
    }

    fn peers_of(&self, description: &ConnectionDescription) -> Vec<Arc<dyn LocalManagerPeer>> {
        let mut peers: Vec<_> = self.peer(&description.client.process).into_iter().collect();
        if !description.is_local() {
            peers.extend(self.peer(&description.server.process));
        }
        peers
    }

    fn find(&self, description: &ConnectionDescription) -> Option<&ConnectionElement> {
        self.connections
            .values()
            .find(|element| element.description() == description)
    }

    fn remove(&mut self, id: ConnectionId) -> Option<Removal> {
        let element = self.connections.remove(&id)?;
        if element.is_connected() {
            let sides = [
                (element.client(), InterfaceRole::Required),
                (element.server(), InterfaceRole::Provided),
            ];
            for (side, role) in sides {
                if let Err(err) = self.registry.remove_connection(side, role, id) {
                    debug!(connection = %id, error = %err, "interface already unregistered");
                }
            }
        }
        let peers = self.peers_of(element.description());
        Some(Removal { element, peers })
    }

    fn remove_where(&mut self, predicate: impl Fn(&ConnectionElement) -> bool) -> Vec<Removal> {
        let ids: Vec<ConnectionId> = self
            .connections
            .values()
            .filter(|element| predicate(*element))
            .map(ConnectionElement::id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove(id)).collect()
    }

    fn missing(&self, id: &InterfaceId, role: InterfaceRole) -> GlobalManagerError {
        match self
            .registry
            .names_of_interfaces(&id.process, &id.component, role)
        {
            Ok(available) => GlobalManagerError::NoSuchInterface {
                id: id.clone(),
                role,
                available,
            },
            Err(err) => err.into(),
        }
    }

    /// Checks both endpoints exist, putting them back in order if swapped
    fn resolve(
        &self,
        client: &InterfaceId,
        server: &InterfaceId,
    ) -> Result<ConnectionDescription, GlobalManagerError> {
        let required = |id: &InterfaceId| self.registry.find_interface(id, InterfaceRole::Required);
        let provided = |id: &InterfaceId| self.registry.find_interface(id, InterfaceRole::Provided);

        if !required(client) && required(server) && provided(client) {
            info!(client = %client, server = %server, "interfaces given in reverse order");
            return Ok(ConnectionDescription::new(server.clone(), client.clone()));
        }
        if !required(client) {
            return Err(self.missing(client, InterfaceRole::Required));
        }
        if !provided(server) {
            return Err(self.missing(server, InterfaceRole::Provided));
        }
        Ok(ConnectionDescription::new(client.clone(), server.clone()))
    }
}

fn announce(removals: Vec<Removal>) {
    for removal in removals {
        for peer in &removal.peers {
            peer.connection_removed(removal.element.id(), removal.element.description());
        }
    }
}

/// System-wide registry and connection broker
pub struct GlobalManager {
    state: Mutex<GlobalState>,
    clock: Arc<dyn Clock>,
    config: GlobalManagerConfig,
}

impl GlobalManager {
    /// Creates a manager timed by the system clock
    pub fn new(config: GlobalManagerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    pub fn with_clock(config: GlobalManagerConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(GlobalState::new()),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &GlobalManagerConfig {
        &self.config
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Registers the local manager that wires connections inside `process`
    pub fn register_peer(&self, process: &str, peer: Weak<dyn LocalManagerPeer>) {
        self.state.lock().peers.insert(process.to_string(), peer);
        debug!(process, "local manager registered");
    }

    pub fn unregister_peer(&self, process: &str) -> bool {
        self.state.lock().peers.remove(process).is_some()
    }

    pub fn add_process(&self, process: &str) -> Result<(), GlobalManagerError> {
        self.state.lock().registry.add_process(process)?;
        debug!(process, "process added");
        Ok(())
    }

    pub fn find_process(&self, process: &str) -> bool {
        self.state.lock().registry.find_process(process)
    }

    /// Removes a process after disconnecting everything it takes part in
    pub fn remove_process(&self, process: &str) -> Result<(), GlobalManagerError> {
        let removals = {
            let mut state = self.state.lock();
            if !state.registry.find_process(process) {
                return Err(RegistryError::ProcessNotFound(process.to_string()).into());
            }
            let removals = state.remove_where(|element| element.involves_process(process));
            state.registry.remove_process(process)?;
            removals
        };
        debug!(process, disconnected = removals.len(), "process removed");
        announce(removals);
        Ok(())
    }

    pub fn add_component(&self, process: &str, component: &str) -> Result<(), GlobalManagerError> {
        self.state.lock().registry.add_component(process, component)?;
        debug!(process, component, "component added");
        Ok(())
    }

    pub fn find_component(&self, process: &str, component: &str) -> bool {
        self.state.lock().registry.find_component(process, component)
    }

    /// Removes a component after disconnecting everything it takes part in
    pub fn remove_component(&self, process: &str, component: &str) -> Result<(), GlobalManagerError> {
        let removals = {
            let mut state = self.state.lock();
            if !state.registry.find_component(process, component) {
                return Err(RegistryError::ComponentNotFound {
                    process: process.to_string(),
                    component: component.to_string(),
                }
                .into());
            }
            let removals =
                state.remove_where(|element| element.involves_component(process, component));
            state.registry.remove_component(process, component)?;
            removals
        };
        debug!(process, component, disconnected = removals.len(), "component removed");
        announce(removals);
        Ok(())
    }

    pub fn add_interface_provided(
        &self,
        id: &InterfaceId,
        is_proxy: bool,
    ) -> Result<(), GlobalManagerError> {
        self.add_interface(id, InterfaceRole::Provided, is_proxy)
    }

    pub fn add_interface_required(
        &self,
        id: &InterfaceId,
        is_proxy: bool,
    ) -> Result<(), GlobalManagerError> {
        self.add_interface(id, InterfaceRole::Required, is_proxy)
    }

    pub fn find_interface_provided(&self, id: &InterfaceId) -> bool {
        self.state
            .lock()
            .registry
            .find_interface(id, InterfaceRole::Provided)
    }

    pub fn find_interface_required(&self, id: &InterfaceId) -> bool {
        self.state
            .lock()
            .registry
            .find_interface(id, InterfaceRole::Required)
    }

    pub fn remove_interface_provided(&self, id: &InterfaceId) -> Result<(), GlobalManagerError> {
        self.remove_interface(id, InterfaceRole::Provided)
    }

    pub fn remove_interface_required(&self, id: &InterfaceId) -> Result<(), GlobalManagerError> {
        self.remove_interface(id, InterfaceRole::Required)
    }

    pub fn names_of_processes(&self) -> Vec<String> {
        self.state.lock().registry.names_of_processes()
    }

    pub fn names_of_components(&self, process: &str) -> Result<Vec<String>, GlobalManagerError> {
        Ok(self.state.lock().registry.names_of_components(process)?)
    }

    pub fn names_of_interfaces_provided(
        &self,
        process: &str,
        component: &str,
    ) -> Result<Vec<String>, GlobalManagerError> {
        Ok(self
            .state
            .lock()
            .registry
            .names_of_interfaces(process, component, InterfaceRole::Provided)?)
    }

    pub fn names_of_interfaces_required(
        &self,
        process: &str,
        component: &str,
    ) -> Result<Vec<String>, GlobalManagerError> {
        Ok(self
            .state
            .lock()
            .registry
            .names_of_interfaces(process, component, InterfaceRole::Required)?)
    }

    pub fn number_of_interfaces(
        &self,
        process: &str,
        component: &str,
    ) -> Result<usize, GlobalManagerError> {
        Ok(self
            .state
            .lock()
            .registry
            .number_of_interfaces(process, component)?)
    }

    /// Records a pending connection from `client` (required) to `server` (provided)
    ///
    /// A same-process connection is wired by the process's local manager and
    /// confirmed right away. A cross-process connection stays pending until
    /// [`GlobalManager::connect_confirm`] or the connect timeout. On failure
    /// nothing is recorded.
    pub fn connect(
        &self,
        requester: &str,
        client: &InterfaceId,
        server: &InterfaceId,
    ) -> Result<ConnectionId, GlobalManagerError> {
        let now = self.clock.now();
        let (id, description, peer) = {
            let mut state = self.state.lock();
            let description = state
                .resolve(client, server)
                .inspect_err(|err| warn!(requester, error = %err, "connect rejected"))?;
            if let Some(existing) = state.find(&description) {
                let err = GlobalManagerError::AlreadyConnected(description.clone());
                warn!(requester, existing = %existing.id(), error = %err, "connect rejected");
                return Err(err);
            }
            let id = state
                .next_id
                .ok_or(GlobalManagerError::IdsExhausted)
                .inspect_err(|err| warn!(requester, error = %err, "connect rejected"))?;
            state.next_id = id.next();

            let expires_at = self
                .config
                .connect_timeout(&description)
                .map(|timeout| Deadline::at(now + timeout));
            state.connections.insert(
                id,
                ConnectionElement::new(id, requester, description.clone(), now, expires_at),
            );
            let peer = if description.is_local() {
                state.peer(&description.client.process)
            } else {
                None
            };
            (id, description, peer)
        };
        info!(requester, connection = %id, description = %description, "connection pending");

        let Some(peer) = peer else {
            return Ok(id);
        };
        if let Err(source) = peer.connect_local(id, &description) {
            self.state.lock().connections.remove(&id);
            warn!(connection = %id, error = %source, "local wiring failed");
            return Err(GlobalManagerError::LocalWiring {
                description,
                source,
            });
        }
        match self.connect_confirm(id) {
            Ok(()) | Err(GlobalManagerError::AlreadyConfirmed(_)) => Ok(id),
            // The timed-out record was removed and announced by the confirm.
            Err(err @ GlobalManagerError::ConfirmTimedOut(_)) => Err(err),
            Err(err) => {
                // Removed while the peer was wiring: its removal notice found
                // nothing to unwind, so unwind now.
                let leftover = self.state.lock().remove(id);
                warn!(connection = %id, error = %err, "connection vanished during local wiring");
                if leftover.is_none() {
                    peer.connection_removed(id, &description);
                } else {
                    announce(leftover.into_iter().collect());
                }
                Err(err)
            }
        }
    }

    /// Marks a pending connection as established
    pub fn connect_confirm(&self, id: ConnectionId) -> Result<(), GlobalManagerError> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        let (connected, expired, description) = {
            let element = state
                .connections
                .get(&id)
                .ok_or(GlobalManagerError::ConnectionNotFound(id))?;
            (
                element.is_connected(),
                element.is_expired(now),
                element.description().clone(),
            )
        };
        if connected {
            return Err(GlobalManagerError::AlreadyConfirmed(id));
        }
        if expired {
            let removal = state.remove(id);
            drop(state);
            warn!(connection = %id, "confirmation arrived after the connect timeout");
            announce(removal.into_iter().collect());
            return Err(GlobalManagerError::ConfirmTimedOut(id));
        }

        state
            .registry
            .interface(&description.client, InterfaceRole::Required)?;
        state
            .registry
            .interface(&description.server, InterfaceRole::Provided)?;
        state
            .registry
            .add_connection(&description.client, InterfaceRole::Required, id)?;
        state
            .registry
            .add_connection(&description.server, InterfaceRole::Provided, id)?;
        if let Some(element) = state.connections.get_mut(&id) {
            element.confirm();
        }
        drop(state);
        info!(connection = %id, description = %description, "connection established");
        Ok(())
    }

    /// Removes the connection between two interfaces, confirmed or not
    pub fn disconnect(
        &self,
        client: &InterfaceId,
        server: &InterfaceId,
    ) -> Result<(), GlobalManagerError> {
        let description = ConnectionDescription::new(client.clone(), server.clone());
        let removal = {
            let mut state = self.state.lock();
            let id = state.find(&description).map(ConnectionElement::id);
            id.and_then(|id| state.remove(id))
        };
        match removal {
            Some(removal) => {
                self.disconnected(removal);
                Ok(())
            }
            None => {
                let err = GlobalManagerError::NotConnected(description);
                warn!(error = %err, "disconnect rejected");
                Err(err)
            }
        }
    }

    pub fn disconnect_by_id(&self, id: ConnectionId) -> Result<(), GlobalManagerError> {
        let removal = self.state.lock().remove(id);
        match removal {
            Some(removal) => {
                self.disconnected(removal);
                Ok(())
            }
            None => {
                warn!(connection = %id, "disconnect rejected: unknown connection");
                Err(GlobalManagerError::ConnectionNotFound(id))
            }
        }
    }

    /// Removes every pending connection whose deadline has passed
    ///
    /// Established connections are never touched. Returns the removed ids.
    pub fn check_connect_timeout(&self) -> Vec<ConnectionId> {
        let now = self.clock.now();
        let removals = self
            .state
            .lock()
            .remove_where(|element| element.is_expired(now));
        let expired: Vec<ConnectionId> = removals.iter().map(|removal| removal.element.id()).collect();
        for removal in &removals {
            warn!(
                connection = %removal.element.id(),
                description = %removal.element.description(),
                "pending connection timed out"
            );
        }
        announce(removals);
        expired
    }

    /// True if a pending or established connection joins the two interfaces
    pub fn is_already_connected(&self, client: &InterfaceId, server: &InterfaceId) -> bool {
        let description = ConnectionDescription::new(client.clone(), server.clone());
        self.state.lock().find(&description).is_some()
    }

    /// Connection of a required interface, if it has one
    pub fn connection_id(&self, client: &InterfaceId) -> Option<ConnectionId> {
        self.state
            .lock()
            .connections
            .values()
            .find(|element| element.client() == client)
            .map(ConnectionElement::id)
    }

    pub fn connection_information(
        &self,
        id: ConnectionId,
    ) -> Result<ConnectionInfo, GlobalManagerError> {
        self.state
            .lock()
            .connections
            .get(&id)
            .map(ConnectionElement::info)
            .ok_or(GlobalManagerError::ConnectionNotFound(id))
    }

    /// Every pending and established connection, ordered by id
    pub fn list_of_connections(&self) -> Vec<ConnectionInfo> {
        self.state
            .lock()
            .connections
            .values()
            .map(ConnectionElement::info)
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.state.lock().connections.len()
    }

    /// Stores the opaque endpoint string of a connection's provided side
    pub fn set_proxy_access_info(
        &self,
        id: ConnectionId,
        info: impl Into<String>,
    ) -> Result<(), GlobalManagerError> {
        let mut state = self.state.lock();
        let element = state
            .connections
            .get_mut(&id)
            .ok_or(GlobalManagerError::ConnectionNotFound(id))?;
        element.set_proxy_access_info(info.into());
        debug!(connection = %id, "proxy access info set");
        Ok(())
    }

    pub fn proxy_access_info(&self, id: ConnectionId) -> Result<String, GlobalManagerError> {
        let state = self.state.lock();
        let element = state
            .connections
            .get(&id)
            .ok_or(GlobalManagerError::ConnectionNotFound(id))?;
        element
            .proxy_access_info()
            .map(str::to_string)
            .ok_or_else(|| GlobalManagerError::NoProxyAccessInfo(id.to_string()))
    }

    /// Endpoint string of `server` as seen from a client in `client_process`
    pub fn proxy_access_info_for_server(
        &self,
        client_process: &str,
        server: &InterfaceId,
    ) -> Result<String, GlobalManagerError> {
        self.state
            .lock()
            .connections
            .values()
            .filter(|element| element.client().process == client_process && element.server() == server)
            .find_map(|element| element.proxy_access_info().map(str::to_string))
            .ok_or_else(|| {
                GlobalManagerError::NoProxyAccessInfo(format!("{} from {}", server, client_process))
            })
    }

    fn add_interface(
        &self,
        id: &InterfaceId,
        role: InterfaceRole,
        is_proxy: bool,
    ) -> Result<(), GlobalManagerError> {
        self.state.lock().registry.add_interface(id, role, is_proxy)?;
        debug!(interface = %id, %role, is_proxy, "interface added");
        Ok(())
    }

    fn remove_interface(&self, id: &InterfaceId, role: InterfaceRole) -> Result<(), GlobalManagerError> {
        let removals = {
            let mut state = self.state.lock();
            state.registry.interface(id, role)?;
            let removals = state.remove_where(|element| match role {
                InterfaceRole::Required => element.client() == id,
                InterfaceRole::Provided => element.server() == id,
            });
            state.registry.remove_interface(id, role)?;
            removals
        };
        debug!(interface = %id, %role, disconnected = removals.len(), "interface removed");
        announce(removals);
        Ok(())
    }

    fn disconnected(&self, removal: Removal) {
        info!(
            connection = %removal.element.id(),
            description = %removal.element.description(),
            status = %removal.element.status(),
            "disconnected"
        );
        announce(vec![removal]);
    }
}

impl Default for GlobalManager {
    fn default() -> Self {
        Self::new(GlobalManagerConfig::default())
    }
}

impl fmt::Debug for GlobalManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("GlobalManager")
            .field("config", &self.config)
            .field("processes", &state.registry.names_of_processes())
            .field("connections", &state.connections.len())
            .finish()
    }
}
