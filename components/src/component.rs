//! Components
//!
//! A component owns named provided and required interfaces and drains their
//! mailboxes once per cycle. It never touches another component's mailbox.

use crate::ComponentError;
use interfaces::{ProvidedInterface, QueuingPolicy, RequiredInterface};
use lifecycle::{ComponentState, Signal, StateMonitor};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, info_span, Span};

/// Unit of concurrency owning a set of interfaces
pub struct Component {
    process: String,
    name: String,
    mailbox_size: usize,
    provided: RwLock<BTreeMap<String, Arc<ProvidedInterface>>>,
    required: RwLock<BTreeMap<String, Arc<RequiredInterface>>>,
    state: StateMonitor,
    wake: Signal,
    span: Span,
}

impl Component {
    /// Creates a component of `process`
    ///
    /// `mailbox_size` sizes every mailbox the component's interfaces create.
    pub fn new(process: impl Into<String>, name: impl Into<String>, mailbox_size: usize) -> Self {
        let process = process.into();
        let name = name.into();
        let span = info_span!("component", process = %process, component = %name);
        Self {
            process,
            name,
            mailbox_size,
            provided: RwLock::new(BTreeMap::new()),
            required: RwLock::new(BTreeMap::new()),
            state: StateMonitor::new(),
            wake: Signal::new(),
            span,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn process_name(&self) -> &str {
        &self.process
    }

    pub fn mailbox_size(&self) -> usize {
        self.mailbox_size
    }

    /// Span carrying the process and component names
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Raised whenever any of the component's mailboxes receives work
    pub fn wake_signal(&self) -> &Signal {
        &self.wake
    }

    /// Adds a provided interface whose void/write commands are queued
    pub fn add_interface_provided(
        &self,
        name: impl Into<String>,
    ) -> Result<Arc<ProvidedInterface>, ComponentError> {
        self.add_interface_provided_with_policy(name, QueuingPolicy::CommandsQueued)
    }

    pub fn add_interface_provided_with_policy(
        &self,
        name: impl Into<String>,
        policy: QueuingPolicy,
    ) -> Result<Arc<ProvidedInterface>, ComponentError> {
        let name = name.into();
        let mut provided = self.provided.write();
        if provided.contains_key(&name) {
            return Err(self.duplicate(name));
        }
        let interface = Arc::new(ProvidedInterface::new(
            self.name.clone(),
            name.clone(),
            policy,
            self.mailbox_size,
        ));
        interface.set_wake_signal(Some(self.wake.clone()));
        provided.insert(name.clone(), Arc::clone(&interface));
        debug!(parent: &self.span, interface = %name, "added provided interface");
        Ok(interface)
    }

    pub fn add_interface_required(
        &self,
        name: impl Into<String>,
    ) -> Result<Arc<RequiredInterface>, ComponentError> {
        let name = name.into();
        let mut required = self.required.write();
        if required.contains_key(&name) {
            return Err(self.duplicate(name));
        }
        let interface = Arc::new(RequiredInterface::new(
            self.name.clone(),
            name.clone(),
            self.mailbox_size,
        ));
        interface.set_wake_signal(Some(self.wake.clone()));
        required.insert(name.clone(), Arc::clone(&interface));
        debug!(parent: &self.span, interface = %name, "added required interface");
        Ok(interface)
    }

    pub fn interface_provided(&self, name: &str) -> Result<Arc<ProvidedInterface>, ComponentError> {
        self.provided
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| self.not_found(name))
    }

    pub fn interface_required(&self, name: &str) -> Result<Arc<RequiredInterface>, ComponentError> {
        self.required
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| self.not_found(name))
    }

    /// Detaches a provided interface during setup
    ///
    /// Registrations and live end users are left alone; once the component
    /// is registered, remove through `LocalManager::remove_interface_provided`.
    pub fn remove_interface_provided(
        &self,
        name: &str,
    ) -> Result<Arc<ProvidedInterface>, ComponentError> {
        self.provided
            .write()
            .remove(name)
            .ok_or_else(|| self.not_found(name))
    }

    /// Detaches a required interface during setup; see `remove_interface_provided`
    pub fn remove_interface_required(
        &self,
        name: &str,
    ) -> Result<Arc<RequiredInterface>, ComponentError> {
        self.required
            .write()
            .remove(name)
            .ok_or_else(|| self.not_found(name))
    }

    pub fn names_of_interfaces_provided(&self) -> Vec<String> {
        self.provided.read().keys().cloned().collect()
    }

    pub fn names_of_interfaces_required(&self) -> Vec<String> {
        self.required.read().keys().cloned().collect()
    }

    /// Drains every end-user mailbox, then every required-interface mailbox
    ///
    /// Returns the number of invocations executed.
    pub fn process_mailboxes(&self) -> usize {
        let _entered = self.span.enter();
        let provided: Vec<Arc<ProvidedInterface>> = self.provided.read().values().cloned().collect();
        let required: Vec<Arc<RequiredInterface>> = self.required.read().values().cloned().collect();

        let mut executed = 0;
        for factory in provided {
            for end_user in factory.end_user_interfaces() {
                if let Some(mailbox) = end_user.mailbox() {
                    executed += mailbox.drain();
                }
            }
        }
        for interface in required {
            executed += interface.process_mailbox();
        }
        executed
    }

    /// True when every required interface is bound
    pub fn are_all_interfaces_required_connected(&self) -> bool {
        self.required
            .read()
            .values()
            .all(|interface| interface.is_connected())
    }

    pub fn state(&self) -> ComponentState {
        self.state.get()
    }

    /// Runs initialization for a component without its own thread
    pub fn create(&self) -> Result<(), ComponentError> {
        self.transition(ComponentState::Initializing)?;
        self.transition(ComponentState::Ready)?;
        Ok(())
    }

    pub fn start(&self) -> Result<(), ComponentError> {
        self.transition(ComponentState::Active)?;
        self.wake.raise();
        Ok(())
    }

    pub fn suspend(&self) -> Result<(), ComponentError> {
        self.transition(ComponentState::Ready)?;
        Ok(())
    }

    /// Stops a component without its own thread
    pub fn kill(&self) -> Result<(), ComponentError> {
        self.transition(ComponentState::Finishing)?;
        self.transition(ComponentState::Finished)?;
        Ok(())
    }

    /// Waits until the component reaches `state` or a later one
    pub fn wait_for_state(
        &self,
        state: ComponentState,
        timeout: Duration,
    ) -> Result<ComponentState, ComponentError> {
        Ok(self.state.wait_for(state, timeout)?)
    }

    pub(crate) fn transition(&self, next: ComponentState) -> Result<(), ComponentError> {
        let previous = self.state.transition(next)?;
        info!(parent: &self.span, from = %previous, to = %next, "state changed");
        Ok(())
    }

    fn duplicate(&self, interface: String) -> ComponentError {
        ComponentError::DuplicateInterface {
            component: self.name.clone(),
            interface,
        }
    }

    fn not_found(&self, interface: &str) -> ComponentError {
        ComponentError::InterfaceNotFound {
            component: self.name.clone(),
            interface: interface.to_string(),
        }
    }
}

impl std::fmt::Debug for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("process", &self.process)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("provided", &self.names_of_interfaces_provided())
            .field("required", &self.names_of_interfaces_required())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ErrorKind;
    use parking_lot::Mutex;

    #[test]
    fn test_interface_names_unique() {
        let component = Component::new("P1", "C1", 4);
        component.add_interface_provided("Server").unwrap();
        let err = component.add_interface_provided("Server").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);

        component.add_interface_required("Client").unwrap();
        assert!(component.add_interface_required("Client").is_err());
        assert_eq!(component.names_of_interfaces_provided(), vec!["Server"]);
        assert_eq!(component.names_of_interfaces_required(), vec!["Client"]);
    }

    #[test]
    fn test_lookup_missing_interface() {
        let component = Component::new("P1", "C1", 4);
        let err = component.interface_provided("Nope").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(component.remove_interface_required("Nope").is_err());
    }

    #[test]
    fn test_process_mailboxes_drains_all_end_users() {
        let component = Component::new("P1", "C1", 4);
        let log = Arc::new(Mutex::new(Vec::new()));
        let server = component.add_interface_provided("Server").unwrap();
        let sink = Arc::clone(&log);
        server
            .add_command_write("Push", move |value: &u8| sink.lock().push(*value))
            .unwrap();

        let first = server.get_end_user_interface("A").unwrap();
        let second = server.get_end_user_interface("B").unwrap();
        first.command("Push").unwrap().execute_write(&1u8).unwrap();
        second.command("Push").unwrap().execute_write(&2u8).unwrap();
        first.command("Push").unwrap().execute_write(&3u8).unwrap();

        assert_eq!(component.process_mailboxes(), 3);
        let mut seen = log.lock().clone();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3]);
        assert_eq!(component.process_mailboxes(), 0);
    }

    #[test]
    fn test_queueing_raises_wake_signal() {
        let component = Component::new("P1", "C1", 4);
        let server = component.add_interface_provided("Server").unwrap();
        server.add_command_void("Ping", || {}).unwrap();
        let end_user = server.get_end_user_interface("A").unwrap();

        assert!(!component.wake_signal().is_raised());
        end_user.command("Ping").unwrap().execute_void().unwrap();
        assert!(component.wake_signal().is_raised());
    }

    #[test]
    fn test_required_connected_check() {
        let component = Component::new("P1", "C1", 4);
        assert!(component.are_all_interfaces_required_connected());

        let required = component.add_interface_required("Client").unwrap();
        required.add_function_void("Ping").unwrap();
        assert!(!component.are_all_interfaces_required_connected());

        let server = Component::new("P1", "C2", 4);
        let provided = server.add_interface_provided("Server").unwrap();
        provided.add_command_void("Ping", || {}).unwrap();
        let end_user = provided.get_end_user_interface("C1").unwrap();
        required.bind(&end_user).unwrap();
        assert!(component.are_all_interfaces_required_connected());
    }

    #[test]
    fn test_passive_lifecycle() {
        let component = Component::new("P1", "C1", 4);
        assert_eq!(component.state(), ComponentState::Constructed);
        assert!(component.start().is_err());

        component.create().unwrap();
        assert_eq!(component.state(), ComponentState::Ready);
        component.start().unwrap();
        assert!(component.state().is_active());
        component.suspend().unwrap();
        assert_eq!(component.state(), ComponentState::Ready);
        component.kill().unwrap();
        assert!(component.state().is_terminal());
        assert_eq!(
            component
                .wait_for_state(ComponentState::Finished, Duration::from_millis(1))
                .unwrap(),
            ComponentState::Finished
        );
    }
}
