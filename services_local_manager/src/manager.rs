//! Local component manager
//!
//! One per process. Components are registered here and with the global
//! manager; connections between two components of this process are wired
//! here when the global manager asks for it.

use crate::{LocalManagerConfig, LocalManagerError};
use components::{Component, ComponentError, ComponentTask};
use core_types::{is_proxy_component, ConnectionDescription, ConnectionId, ErrorKind, InterfaceId};
use interfaces::{ProvidedInterface, RequiredInterface};
use lifecycle::ComponentState;
use parking_lot::{Mutex, RwLock};
use services_global_manager::{GlobalManager, GlobalManagerError, LocalManagerPeer, PeerError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client side of a wiring: component and required interface
type WiringKey = (String, String);

#[derive(Debug, Clone)]
struct Wiring {
    server: InterfaceId,
    user: String,
}

/// Per-process registry and local connection executor
pub struct LocalManager {
    process: String,
    global: Arc<GlobalManager>,
    config: LocalManagerConfig,
    components: RwLock<BTreeMap<String, Arc<Component>>>,
    tasks: RwLock<BTreeMap<String, Arc<ComponentTask>>>,
    wirings: Mutex<BTreeMap<WiringKey, Wiring>>,
}

impl LocalManager {
    /// Registers `process` with the global manager and becomes its peer
    pub fn new(
        process: impl Into<String>,
        global: Arc<GlobalManager>,
        config: LocalManagerConfig,
    ) -> Result<Arc<Self>, LocalManagerError> {
        let process = process.into();
        global.add_process(&process)?;

        let manager = Arc::new(Self {
            process: process.clone(),
            global: Arc::clone(&global),
            config,
            components: RwLock::new(BTreeMap::new()),
            tasks: RwLock::new(BTreeMap::new()),
            wirings: Mutex::new(BTreeMap::new()),
        });
        let weak = Arc::downgrade(&manager);
        let peer: Weak<dyn LocalManagerPeer> = weak;
        global.register_peer(&process, peer);
        info!(process = %process, "local manager ready");
        Ok(manager)
    }

    pub fn process_name(&self) -> &str {
        &self.process
    }

    pub fn global(&self) -> &Arc<GlobalManager> {
        &self.global
    }

    pub fn config(&self) -> &LocalManagerConfig {
        &self.config
    }

    /// Builds a component of this process with the configured mailbox size
    ///
    /// The component is not registered until [`LocalManager::add_component`].
    pub fn build_component(&self, name: impl Into<String>) -> Arc<Component> {
        Arc::new(Component::new(
            self.process.clone(),
            name,
            self.config.mailbox_size,
        ))
    }

    /// Registers a component and every interface it has so far
    pub fn add_component(&self, component: Arc<Component>) -> Result<(), LocalManagerError> {
        if component.process_name() != self.process {
            return Err(LocalManagerError::ForeignComponent {
                component: component.name().to_string(),
                owner: component.process_name().to_string(),
                process: self.process.clone(),
            });
        }
        let name = component.name().to_string();
        if self.components.read().contains_key(&name) {
            return Err(LocalManagerError::ComponentAlreadyAdded(name));
        }

        self.global.add_component(&self.process, &name)?;
        if let Err(err) = self.register_interfaces_of(&component) {
            if let Err(cleanup) = self.global.remove_component(&self.process, &name) {
                warn!(component = %name, error = %cleanup, "could not roll back registration");
            }
            return Err(err);
        }
        self.components.write().insert(name.clone(), component);
        debug!(process = %self.process, component = %name, "component added");
        Ok(())
    }

    /// Registers a component driven by its own thread
    pub fn add_task(&self, task: Arc<ComponentTask>) -> Result<(), LocalManagerError> {
        self.add_component(Arc::clone(task.component()))?;
        self.tasks
            .write()
            .insert(task.component().name().to_string(), task);
        Ok(())
    }

    /// Registers interfaces added to a component after it was added
    ///
    /// Returns how many interfaces were new to the global manager.
    pub fn register_interfaces(&self, component: &str) -> Result<usize, LocalManagerError> {
        let component = self.get_component(component)?;
        self.register_interfaces_of(&component)
    }

    pub fn get_component(&self, name: &str) -> Result<Arc<Component>, LocalManagerError> {
        self.components
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| LocalManagerError::ComponentNotFound(name.to_string()))
    }

    pub fn get_task(&self, name: &str) -> Option<Arc<ComponentTask>> {
        self.tasks.read().get(name).cloned()
    }

    pub fn find_component(&self, name: &str) -> bool {
        self.components.read().contains_key(name)
    }

    pub fn names_of_components(&self) -> Vec<String> {
        self.components.read().keys().cloned().collect()
    }

    /// Disconnects everything the component takes part in, then forgets it
    pub fn remove_component(&self, name: &str) -> Result<Arc<Component>, LocalManagerError> {
        if !self.find_component(name) {
            return Err(LocalManagerError::ComponentNotFound(name.to_string()));
        }
        self.global.remove_component(&self.process, name)?;

        self.unwind_where(|(client, _), wiring| client == name || wiring.server.component == name);

        self.tasks.write().remove(name);
        let removed = self
            .components
            .write()
            .remove(name)
            .ok_or_else(|| LocalManagerError::ComponentNotFound(name.to_string()))?;
        debug!(process = %self.process, component = %name, "component removed");
        Ok(removed)
    }

    /// Removes a provided interface, disconnecting and unwinding its users
    pub fn remove_interface_provided(
        &self,
        component: &str,
        interface: &str,
    ) -> Result<Arc<ProvidedInterface>, LocalManagerError> {
        let owner = self.get_component(component)?;
        owner.interface_provided(interface)?;
        let id = self.interface_id(component, interface);
        unregistered(&id, self.global.remove_interface_provided(&id))?;
        self.unwind_where(|_, wiring| wiring.server == id);
        Ok(owner.remove_interface_provided(interface)?)
    }

    /// Removes a required interface, disconnecting it first
    pub fn remove_interface_required(
        &self,
        component: &str,
        interface: &str,
    ) -> Result<Arc<RequiredInterface>, LocalManagerError> {
        let owner = self.get_component(component)?;
        owner.interface_required(interface)?;
        let id = self.interface_id(component, interface);
        unregistered(&id, self.global.remove_interface_required(&id))?;
        self.unwind_where(|(client, required), _| client == component && required == interface);
        Ok(owner.remove_interface_required(interface)?)
    }

    /// Connects two components of this process through the global manager
    pub fn connect(
        &self,
        client_component: &str,
        client_interface: &str,
        server_component: &str,
        server_interface: &str,
    ) -> Result<ConnectionId, LocalManagerError> {
        let client = self.interface_id(client_component, client_interface);
        let server = self.interface_id(server_component, server_interface);
        self.request_connect(&client, &server)
    }

    /// Asks the global manager for a connection on behalf of this process
    ///
    /// Same-process connections come back wired and confirmed; others stay
    /// pending until confirmed by the transport.
    pub fn request_connect(
        &self,
        client: &InterfaceId,
        server: &InterfaceId,
    ) -> Result<ConnectionId, LocalManagerError> {
        Ok(self.global.connect(&self.process, client, server)?)
    }

    pub fn disconnect(
        &self,
        client_component: &str,
        client_interface: &str,
        server_component: &str,
        server_interface: &str,
    ) -> Result<(), LocalManagerError> {
        let client = self.interface_id(client_component, client_interface);
        let server = self.interface_id(server_component, server_interface);
        self.request_disconnect(&client, &server)
    }

    pub fn request_disconnect(
        &self,
        client: &InterfaceId,
        server: &InterfaceId,
    ) -> Result<(), LocalManagerError> {
        Ok(self.global.disconnect(client, server)?)
    }

    /// Binds a required interface to a fresh end-user clone of a provided one
    ///
    /// Nothing is left behind on failure. A required interface can only be
    /// wired once.
    pub fn connect_locally(
        &self,
        client_component: &str,
        client_interface: &str,
        server_component: &str,
        server_interface: &str,
    ) -> Result<(), LocalManagerError> {
        let required = self
            .get_component(client_component)?
            .interface_required(client_interface)?;
        let provided = self
            .get_component(server_component)?
            .interface_provided(server_interface)?;

        let user = format!("{}.{}", client_component, client_interface);
        let end_user = provided.get_end_user_interface(&user)?;
        if let Err(err) = required.bind(&end_user) {
            if let Err(cleanup) = provided.remove_end_user_interface(&user) {
                warn!(user = %user, error = %cleanup, "could not drop end-user interface");
            }
            return Err(err.into());
        }

        self.wirings.lock().insert(
            (client_component.to_string(), client_interface.to_string()),
            Wiring {
                server: self.interface_id(server_component, server_interface),
                user,
            },
        );
        info!(
            process = %self.process,
            client = %format!("{}.{}", client_component, client_interface),
            server = %format!("{}.{}", server_component, server_interface),
            "interfaces wired"
        );
        Ok(())
    }

    /// Unbinds a required interface and drops the end-user clone it used
    pub fn disconnect_locally(
        &self,
        client_component: &str,
        client_interface: &str,
    ) -> Result<(), LocalManagerError> {
        let key = (client_component.to_string(), client_interface.to_string());
        let wiring = self
            .wirings
            .lock()
            .remove(&key)
            .ok_or_else(|| LocalManagerError::NotWired {
                component: client_component.to_string(),
                interface: client_interface.to_string(),
            })?;

        let required = self
            .get_component(client_component)
            .ok()
            .and_then(|component| component.interface_required(client_interface).ok());
        match required {
            Some(required) => {
                if let Err(err) = required.unbind() {
                    debug!(error = %err, "required interface was not bound");
                }
            }
            None => debug!(component = %client_component, "client side already gone"),
        }

        let provided = self
            .get_component(&wiring.server.component)?
            .interface_provided(&wiring.server.interface)?;
        provided.remove_end_user_interface(&wiring.user)?;
        info!(
            process = %self.process,
            client = %format!("{}.{}", client_component, client_interface),
            server = %wiring.server,
            "interfaces unwired"
        );
        Ok(())
    }

    /// Provided interface a required interface is wired to
    pub fn connected_server(
        &self,
        client_component: &str,
        client_interface: &str,
    ) -> Option<InterfaceId> {
        self.wirings
            .lock()
            .get(&(client_component.to_string(), client_interface.to_string()))
            .map(|wiring| wiring.server.clone())
    }

    pub fn names_of_interfaces_provided(&self, component: &str) -> Result<Vec<String>, LocalManagerError> {
        Ok(self.get_component(component)?.names_of_interfaces_provided())
    }

    pub fn names_of_interfaces_required(&self, component: &str) -> Result<Vec<String>, LocalManagerError> {
        Ok(self.get_component(component)?.names_of_interfaces_required())
    }

    pub fn names_of_commands(
        &self,
        component: &str,
        interface: &str,
    ) -> Result<Vec<String>, LocalManagerError> {
        Ok(self
            .get_component(component)?
            .interface_provided(interface)?
            .command_names())
    }

    pub fn names_of_event_generators(
        &self,
        component: &str,
        interface: &str,
    ) -> Result<Vec<String>, LocalManagerError> {
        Ok(self
            .get_component(component)?
            .interface_provided(interface)?
            .event_names())
    }

    pub fn names_of_functions(
        &self,
        component: &str,
        interface: &str,
    ) -> Result<Vec<String>, LocalManagerError> {
        Ok(self
            .get_component(component)?
            .interface_required(interface)?
            .function_names())
    }

    pub fn names_of_event_handlers(
        &self,
        component: &str,
        interface: &str,
    ) -> Result<Vec<String>, LocalManagerError> {
        Ok(self
            .get_component(component)?
            .interface_required(interface)?
            .event_handler_names())
    }

    /// Signature of a command, e.g. `QueuedWrite(i32)`
    pub fn description_of_command(
        &self,
        component: &str,
        interface: &str,
        command: &str,
    ) -> Result<String, LocalManagerError> {
        Ok(self
            .get_component(component)?
            .interface_provided(interface)?
            .command_description(command)?)
    }

    pub fn description_of_event_generator(
        &self,
        component: &str,
        interface: &str,
        event: &str,
    ) -> Result<String, LocalManagerError> {
        Ok(self
            .get_component(component)?
            .interface_provided(interface)?
            .event_description(event)?)
    }

    pub fn description_of_function(
        &self,
        component: &str,
        interface: &str,
        function: &str,
    ) -> Result<String, LocalManagerError> {
        self.get_component(component)?
            .interface_required(interface)?
            .function_description(function)
            .ok_or_else(|| LocalManagerError::HandleNotFound {
                component: component.to_string(),
                interface: interface.to_string(),
                name: function.to_string(),
            })
    }

    pub fn description_of_event_handler(
        &self,
        component: &str,
        interface: &str,
        handler: &str,
    ) -> Result<String, LocalManagerError> {
        self.get_component(component)?
            .interface_required(interface)?
            .event_handler_description(handler)
            .ok_or_else(|| LocalManagerError::HandleNotFound {
                component: component.to_string(),
                interface: interface.to_string(),
                name: handler.to_string(),
            })
    }

    /// Initializes every component without its own thread
    ///
    /// Tasks are created by their owner, which supplies the behavior.
    pub fn create_all(&self) -> Result<(), LocalManagerError> {
        self.for_each_component("create", |component, task| match task {
            None if component.state() == ComponentState::Constructed => component.create(),
            _ => Ok(()),
        })
    }

    /// Starts every component that is ready
    pub fn start_all(&self) -> Result<(), LocalManagerError> {
        self.for_each_component("start", |component, task| {
            if component.state() != ComponentState::Ready {
                debug!(component = component.name(), state = %component.state(), "not ready, not started");
                return Ok(());
            }
            match task {
                Some(task) => task.start(),
                None => component.start(),
            }
        })
    }

    /// Kills every component, waiting up to `timeout` for each task thread
    pub fn kill_all(&self, timeout: Duration) -> Result<(), LocalManagerError> {
        self.for_each_component("kill", |component, task| match task {
            Some(task) => task.kill(timeout),
            None if component.state().is_terminal() => Ok(()),
            None => component.kill(),
        })
    }

    /// Waits until every component reached `state` or a later one
    pub fn wait_for_state_all(
        &self,
        state: ComponentState,
        timeout: Duration,
    ) -> Result<(), LocalManagerError> {
        self.for_each_component("wait", |component, _| {
            component.wait_for_state(state, timeout).map(|_| ())
        })
    }

    /// Runs `step` on every component, reporting the first failure
    fn for_each_component(
        &self,
        action: &str,
        mut step: impl FnMut(&Arc<Component>, Option<&Arc<ComponentTask>>) -> Result<(), ComponentError>,
    ) -> Result<(), LocalManagerError> {
        let components: Vec<Arc<Component>> = self.components.read().values().cloned().collect();
        let tasks = self.tasks.read().clone();

        let mut first = None;
        for component in &components {
            if let Err(err) = step(component, tasks.get(component.name())) {
                warn!(component = component.name(), action, error = %err, "lifecycle step failed");
                first.get_or_insert(err);
            }
        }
        match first {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    fn register_interfaces_of(&self, component: &Component) -> Result<usize, LocalManagerError> {
        let is_proxy = is_proxy_component(component.name());
        let mut added = 0;
        for interface in component.names_of_interfaces_provided() {
            let id = self.interface_id(component.name(), &interface);
            if !self.global.find_interface_provided(&id) {
                self.global.add_interface_provided(&id, is_proxy)?;
                added += 1;
            }
        }
        for interface in component.names_of_interfaces_required() {
            let id = self.interface_id(component.name(), &interface);
            if !self.global.find_interface_required(&id) {
                self.global.add_interface_required(&id, is_proxy)?;
                added += 1;
            }
        }
        Ok(added)
    }

    /// Unwinds wirings the global manager no longer knows about
    fn unwind_where(&self, predicate: impl Fn(&WiringKey, &Wiring) -> bool) {
        let leftovers: Vec<WiringKey> = self
            .wirings
            .lock()
            .iter()
            .filter(|(key, wiring)| predicate(key, wiring))
            .map(|(key, _)| key.clone())
            .collect();
        for (client, interface) in leftovers {
            if let Err(err) = self.disconnect_locally(&client, &interface) {
                warn!(component = %client, interface = %interface, error = %err, "could not unwind wiring");
            }
        }
    }

    fn interface_id(&self, component: &str, interface: &str) -> InterfaceId {
        InterfaceId::new(self.process.as_str(), component, interface)
    }
}

/// Interfaces added after registration may be unknown to the global manager
fn unregistered(id: &InterfaceId, result: Result<(), GlobalManagerError>) -> Result<(), LocalManagerError> {
    match result {
        Err(err) if err.kind() == ErrorKind::NotFound => {
            debug!(interface = %id, "interface was never registered globally");
            Ok(())
        }
        other => Ok(other?),
    }
}

impl LocalManagerPeer for LocalManager {
    fn connect_local(
        &self,
        connection: ConnectionId,
        description: &ConnectionDescription,
    ) -> Result<(), PeerError> {
        if description.client.process != self.process || description.server.process != self.process {
            return Err(PeerError::new(
                ErrorKind::PolicyViolation,
                format!("{} is not local to process '{}'", description, self.process),
            ));
        }
        self.connect_locally(
            &description.client.component,
            &description.client.interface,
            &description.server.component,
            &description.server.interface,
        )?;
        debug!(connection = %connection, "local wiring done");
        Ok(())
    }

    fn connection_removed(&self, connection: ConnectionId, description: &ConnectionDescription) {
        if description.client.process != self.process {
            debug!(connection = %connection, "no client-side wiring in this process");
            return;
        }
        let wired_here = self
            .connected_server(&description.client.component, &description.client.interface)
            .map(|server| server == description.server)
            .unwrap_or(false);
        if !wired_here {
            debug!(connection = %connection, "removed connection was never wired here");
            return;
        }
        if let Err(err) =
            self.disconnect_locally(&description.client.component, &description.client.interface)
        {
            warn!(connection = %connection, error = %err, "could not unwind wiring");
        }
    }
}

impl fmt::Debug for LocalManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalManager")
            .field("process", &self.process)
            .field("components", &self.names_of_components())
            .field("wirings", &self.wirings.lock().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use components::TaskMode;
    use interfaces::FunctionWrite;
    use services_global_manager::{ConnectionStatus, GlobalManagerConfig};

    fn manager(process: &str) -> (Arc<GlobalManager>, Arc<LocalManager>) {
        let global = Arc::new(GlobalManager::new(GlobalManagerConfig::default()));
        let local = LocalManager::new(process, Arc::clone(&global), LocalManagerConfig::default())
            .unwrap();
        (global, local)
    }

    /// Server with a queued `Add` command accumulating into a shared total
    fn add_server(local: &LocalManager, name: &str) -> (Arc<Component>, Arc<Mutex<i32>>) {
        let total = Arc::new(Mutex::new(0));
        let component = local.build_component(name);
        let provided = component.add_interface_provided("Adder").unwrap();
        let sink = Arc::clone(&total);
        provided
            .add_command_write("Add", move |value: &i32| *sink.lock() += *value)
            .unwrap();
        let source = Arc::clone(&total);
        provided
            .add_command_read("Total", move |out: &mut i32| *out = *source.lock())
            .unwrap();
        provided.add_event_write::<i32>("Overflow").unwrap();
        local.add_component(Arc::clone(&component)).unwrap();
        (component, total)
    }

    fn add_client(local: &LocalManager, name: &str) -> (Arc<Component>, FunctionWrite<i32>) {
        let component = local.build_component(name);
        let required = component.add_interface_required("Adder").unwrap();
        let add = required.add_function_write::<i32>("Add").unwrap();
        required.add_function_read::<i32>("Total").unwrap();
        local.add_component(Arc::clone(&component)).unwrap();
        (component, add)
    }

    #[test]
    fn test_new_registers_process() {
        let (global, local) = manager("P1");
        assert!(global.find_process("P1"));
        assert_eq!(local.process_name(), "P1");

        let err = LocalManager::new("P1", global, LocalManagerConfig::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);
    }

    #[test]
    fn test_add_component_registers_interfaces() {
        let (global, local) = manager("P1");
        add_server(&local, "Server");
        add_client(&local, "Client");

        assert_eq!(local.names_of_components(), vec!["Client", "Server"]);
        assert!(global.find_interface_provided(&InterfaceId::new("P1", "Server", "Adder")));
        assert!(global.find_interface_required(&InterfaceId::new("P1", "Client", "Adder")));

        let again = local.build_component("Server");
        let err = local.add_component(again).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);
    }

    #[test]
    fn test_foreign_component_rejected() {
        let (_global, local) = manager("P1");
        let foreign = Arc::new(Component::new("P2", "Other", 4));
        let err = local.add_component(foreign).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    }

    #[test]
    fn test_register_interfaces_added_later() {
        let (global, local) = manager("P1");
        let component = local.build_component("Late");
        local.add_component(Arc::clone(&component)).unwrap();
        component.add_interface_provided("Extra").unwrap();

        assert_eq!(local.register_interfaces("Late").unwrap(), 1);
        assert_eq!(local.register_interfaces("Late").unwrap(), 0);
        assert!(global.find_interface_provided(&InterfaceId::new("P1", "Late", "Extra")));
    }

    #[test]
    fn test_connect_wires_and_confirms() {
        let (global, local) = manager("P1");
        let (server, total) = add_server(&local, "Server");
        let (_client, add) = add_client(&local, "Client");

        let id = local.connect("Client", "Adder", "Server", "Adder").unwrap();
        assert_eq!(
            global.connection_information(id).unwrap().status,
            ConnectionStatus::Connected
        );
        assert_eq!(
            local.connected_server("Client", "Adder"),
            Some(InterfaceId::new("P1", "Server", "Adder"))
        );

        add.call(&3).unwrap();
        add.call(&4).unwrap();
        assert_eq!(*total.lock(), 0);
        assert_eq!(server.process_mailboxes(), 2);
        assert_eq!(*total.lock(), 7);
    }

    #[test]
    fn test_connect_unknown_interface_leaves_nothing() {
        let (global, local) = manager("P1");
        let (server, _total) = add_server(&local, "Server");
        add_client(&local, "Client");

        let err = local
            .connect("Client", "Adder", "Server", "Missing")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(global.connection_count(), 0);
        assert_eq!(server.interface_provided("Adder").unwrap().end_user_count(), 0);
    }

    #[test]
    fn test_required_interface_connects_once() {
        let (global, local) = manager("P1");
        let (first, _) = add_server(&local, "First");
        let (second, _) = add_server(&local, "Second");
        add_client(&local, "Client");

        local.connect("Client", "Adder", "First", "Adder").unwrap();
        let err = local
            .connect("Client", "Adder", "Second", "Adder")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyConnected);
        assert_eq!(global.connection_count(), 1);
        assert_eq!(first.interface_provided("Adder").unwrap().end_user_count(), 1);
        assert_eq!(second.interface_provided("Adder").unwrap().end_user_count(), 0);
    }

    #[test]
    fn test_disconnect_unwinds_wiring() {
        let (global, local) = manager("P1");
        let (server, _total) = add_server(&local, "Server");
        let (client, add) = add_client(&local, "Client");

        local.connect("Client", "Adder", "Server", "Adder").unwrap();
        local.disconnect("Client", "Adder", "Server", "Adder").unwrap();

        assert_eq!(global.connection_count(), 0);
        assert!(!add.is_bound());
        assert!(!client.are_all_interfaces_required_connected());
        assert_eq!(server.interface_provided("Adder").unwrap().end_user_count(), 0);
        assert_eq!(local.connected_server("Client", "Adder"), None);

        local.connect("Client", "Adder", "Server", "Adder").unwrap();
        assert!(add.is_bound());
    }

    /// Disconnects the pending record before handing over to the real manager
    struct DisconnectingPeer {
        local: Arc<LocalManager>,
    }

    impl LocalManagerPeer for DisconnectingPeer {
        fn connect_local(
            &self,
            connection: ConnectionId,
            description: &ConnectionDescription,
        ) -> Result<(), PeerError> {
            self.local.global().disconnect_by_id(connection).unwrap();
            self.local.connect_local(connection, description)
        }

        fn connection_removed(&self, connection: ConnectionId, description: &ConnectionDescription) {
            self.local.connection_removed(connection, description);
        }
    }

    #[test]
    fn test_disconnect_during_wiring_leaves_nothing() {
        let (global, local) = manager("P1");
        let (server, _total) = add_server(&local, "Server");
        let (_client, add) = add_client(&local, "Client");

        let peer = Arc::new(DisconnectingPeer {
            local: Arc::clone(&local),
        });
        let weak = Arc::downgrade(&peer);
        global.register_peer("P1", weak);

        let err = local
            .connect("Client", "Adder", "Server", "Adder")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(global.connection_count(), 0);
        assert_eq!(local.connected_server("Client", "Adder"), None);
        assert!(!add.is_bound());
        assert_eq!(server.interface_provided("Adder").unwrap().end_user_count(), 0);

        let weak = Arc::downgrade(&local);
        global.register_peer("P1", weak);
        local.connect("Client", "Adder", "Server", "Adder").unwrap();
        assert!(add.is_bound());
    }

    #[test]
    fn test_each_client_gets_its_own_mailbox() {
        let (_global, local) = manager("P1");
        let (server, _total) = add_server(&local, "Server");
        add_client(&local, "A");
        add_client(&local, "B");

        local.connect("A", "Adder", "Server", "Adder").unwrap();
        local.connect("B", "Adder", "Server", "Adder").unwrap();

        let factory = server.interface_provided("Adder").unwrap();
        let users = factory.end_user_interfaces();
        assert_eq!(users.len(), 2);
        let first = users[0].mailbox().unwrap().id();
        let second = users[1].mailbox().unwrap().id();
        assert_ne!(first, second);
    }

    #[test]
    fn test_remove_component_unwinds_clients() {
        let (global, local) = manager("P1");
        add_server(&local, "Server");
        let (_client, add) = add_client(&local, "Client");
        local.connect("Client", "Adder", "Server", "Adder").unwrap();

        local.remove_component("Server").unwrap();
        assert!(!local.find_component("Server"));
        assert!(!global.find_component("P1", "Server"));
        assert_eq!(global.connection_count(), 0);
        assert!(!add.is_bound());
        assert!(local.remove_component("Server").is_err());
    }

    #[test]
    fn test_remove_interface_provided_unwinds_users() {
        let (global, local) = manager("P1");
        let (server, _total) = add_server(&local, "Server");
        let (client, add) = add_client(&local, "Client");
        local.connect("Client", "Adder", "Server", "Adder").unwrap();
        let provided = server.interface_provided("Adder").unwrap();

        let removed = local.remove_interface_provided("Server", "Adder").unwrap();
        assert!(Arc::ptr_eq(&removed, &provided));
        assert_eq!(provided.end_user_count(), 0);
        assert_eq!(global.connection_count(), 0);
        assert!(!global.find_interface_provided(&InterfaceId::new("P1", "Server", "Adder")));
        assert!(server.interface_provided("Adder").is_err());
        assert!(!add.is_bound());
        assert!(!client.are_all_interfaces_required_connected());
        assert_eq!(local.connected_server("Client", "Adder"), None);

        let err = local.remove_interface_provided("Server", "Adder").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_remove_interface_required_releases_end_user() {
        let (global, local) = manager("P1");
        let (server, _total) = add_server(&local, "Server");
        let (client, add) = add_client(&local, "Client");
        local.connect("Client", "Adder", "Server", "Adder").unwrap();

        local.remove_interface_required("Client", "Adder").unwrap();
        assert_eq!(server.interface_provided("Adder").unwrap().end_user_count(), 0);
        assert_eq!(global.connection_count(), 0);
        assert!(!global.find_interface_required(&InterfaceId::new("P1", "Client", "Adder")));
        assert!(client.interface_required("Adder").is_err());
        assert!(!add.is_bound());
    }

    #[test]
    fn test_remove_unregistered_interface() {
        let (_global, local) = manager("P1");
        let component = local.build_component("Late");
        local.add_component(Arc::clone(&component)).unwrap();
        component.add_interface_provided("Extra").unwrap();

        local.remove_interface_provided("Late", "Extra").unwrap();
        assert!(component.names_of_interfaces_provided().is_empty());
    }

    #[test]
    fn test_cross_process_request_stays_pending() {
        let global = Arc::new(GlobalManager::default());
        let p1 = LocalManager::new("P1", Arc::clone(&global), LocalManagerConfig::default()).unwrap();
        let p2 = LocalManager::new("P2", Arc::clone(&global), LocalManagerConfig::default()).unwrap();
        add_server(&p1, "Server");
        let (_client, add) = add_client(&p2, "Client");

        let id = p2
            .request_connect(
                &InterfaceId::new("P2", "Client", "Adder"),
                &InterfaceId::new("P1", "Server", "Adder"),
            )
            .unwrap();
        assert_eq!(
            global.connection_information(id).unwrap().status,
            ConnectionStatus::Pending
        );
        assert!(!add.is_bound());

        global.connect_confirm(id).unwrap();
        p2.request_disconnect(
            &InterfaceId::new("P2", "Client", "Adder"),
            &InterfaceId::new("P1", "Server", "Adder"),
        )
        .unwrap();
        assert_eq!(global.connection_count(), 0);
    }

    #[test]
    fn test_introspection() {
        let (_global, local) = manager("P1");
        add_server(&local, "Server");
        add_client(&local, "Client");

        assert_eq!(local.names_of_commands("Server", "Adder").unwrap(), vec!["Add", "Total"]);
        assert_eq!(local.names_of_event_generators("Server", "Adder").unwrap(), vec!["Overflow"]);
        assert_eq!(local.names_of_functions("Client", "Adder").unwrap(), vec!["Add", "Total"]);
        assert!(local.names_of_event_handlers("Client", "Adder").unwrap().is_empty());
        assert_eq!(local.names_of_interfaces_provided("Server").unwrap(), vec!["Adder"]);
        assert_eq!(local.names_of_interfaces_required("Client").unwrap(), vec!["Adder"]);

        assert_eq!(
            local.description_of_command("Server", "Adder", "Add").unwrap(),
            "QueuedWrite(i32)"
        );
        assert!(local.description_of_function("Client", "Adder", "Add").is_ok());
        let err = local
            .description_of_function("Client", "Adder", "Nope")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(local.description_of_event_handler("Client", "Adder", "Nope").is_err());
    }

    #[test]
    fn test_lifecycle_of_all_components() {
        let (_global, local) = manager("P1");
        let (server, _total) = add_server(&local, "Server");
        let (client, _add) = add_client(&local, "Client");

        local.create_all().unwrap();
        local
            .wait_for_state_all(ComponentState::Ready, Duration::from_millis(10))
            .unwrap();
        local.start_all().unwrap();
        assert!(server.state().is_active());
        assert!(client.state().is_active());

        local.kill_all(Duration::from_millis(10)).unwrap();
        assert!(server.state().is_terminal());
        assert!(client.state().is_terminal());
    }

    #[test]
    fn test_task_registered_and_killed() {
        struct Idle;
        impl components::ComponentBehavior for Idle {
            fn run(&mut self, _component: &Component) {}
        }

        let (_global, local) = manager("P1");
        let component = local.build_component("Worker");
        let task = Arc::new(ComponentTask::new(
            component,
            TaskMode::Periodic(Duration::from_millis(1)),
        ));
        local.add_task(Arc::clone(&task)).unwrap();
        assert!(local.get_task("Worker").is_some());

        task.create(Idle).unwrap();
        local
            .wait_for_state_all(ComponentState::Ready, Duration::from_secs(5))
            .unwrap();
        local.start_all().unwrap();
        local.kill_all(Duration::from_secs(5)).unwrap();
        assert_eq!(task.component().state(), ComponentState::Finished);
    }
}
