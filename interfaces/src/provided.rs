//! Provided interfaces
//!
//! The interface a component adds is a *factory*. Each connected caller
//! gets its own *end-user* clone with a private mailbox, so every mailbox
//! has exactly one writer. Queued commands are re-bound to the clone's
//! mailbox; read commands and event generators are shared with the factory.

use crate::InterfaceError;
use core_types::end_user_interface_name;
use ipc::{Argument, Command, CommandKind, EventGenerator, Mailbox};
use lifecycle::Signal;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Whether void and write commands of an interface are queued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueuingPolicy {
    /// Void/write commands run on the owner's thread via a mailbox
    CommandsQueued,
    /// Every command runs on the caller's thread
    CommandsNotQueued,
}

enum Role {
    Factory {
        end_users: RwLock<BTreeMap<String, Arc<ProvidedInterface>>>,
        /// Set by the first clone; commands and events are fixed from then on
        spawned: AtomicBool,
    },
    EndUser {
        user: String,
        mailbox: Arc<Mailbox>,
    },
}

/// Named bundle of commands and events offered by a component
pub struct ProvidedInterface {
    name: String,
    factory_name: String,
    component: String,
    policy: QueuingPolicy,
    mailbox_size: usize,
    commands: RwLock<BTreeMap<String, Arc<Command>>>,
    events: RwLock<BTreeMap<String, Arc<EventGenerator>>>,
    wake: RwLock<Option<Signal>>,
    role: Role,
}

impl ProvidedInterface {
    /// Creates a factory interface
    ///
    /// `mailbox_size` is the capacity of every end-user mailbox.
    pub fn new(
        component: impl Into<String>,
        name: impl Into<String>,
        policy: QueuingPolicy,
        mailbox_size: usize,
    ) -> Self {
        let name = name.into();
        Self {
            factory_name: name.clone(),
            name,
            component: component.into(),
            policy,
            mailbox_size,
            commands: RwLock::new(BTreeMap::new()),
            events: RwLock::new(BTreeMap::new()),
            wake: RwLock::new(None),
            role: Role::Factory {
                end_users: RwLock::new(BTreeMap::new()),
                spawned: AtomicBool::new(false),
            },
        }
    }

    /// Interface name; end users are named `factory[user]`
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the factory this interface belongs to
    pub fn factory_name(&self) -> &str {
        &self.factory_name
    }

    pub fn component_name(&self) -> &str {
        &self.component
    }

    pub fn policy(&self) -> QueuingPolicy {
        self.policy
    }

    pub fn mailbox_size(&self) -> usize {
        self.mailbox_size
    }

    pub fn is_factory(&self) -> bool {
        matches!(self.role, Role::Factory { .. })
    }

    pub fn is_end_user(&self) -> bool {
        matches!(self.role, Role::EndUser { .. })
    }

    /// User name of an end-user interface
    pub fn user_name(&self) -> Option<&str> {
        match &self.role {
            Role::EndUser { user, .. } => Some(user),
            Role::Factory { .. } => None,
        }
    }

    /// Mailbox of an end-user interface
    pub fn mailbox(&self) -> Option<&Arc<Mailbox>> {
        match &self.role {
            Role::EndUser { mailbox, .. } => Some(mailbox),
            Role::Factory { .. } => None,
        }
    }

    /// Adds a command, queuing void/write commands if the policy says so
    pub fn add_command(&self, command: Command) -> Result<Arc<Command>, InterfaceError> {
        let command = match (self.policy, command.kind()) {
            (QueuingPolicy::CommandsQueued, CommandKind::DirectVoid)
            | (QueuingPolicy::CommandsQueued, CommandKind::DirectWrite) => command.into_queued()?,
            _ => command,
        };
        self.insert_command(command)
    }

    /// Adds a command that always runs on the caller's thread
    pub fn add_command_direct(&self, command: Command) -> Result<Arc<Command>, InterfaceError> {
        self.insert_command(command)
    }

    pub fn add_command_void<F>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> Result<Arc<Command>, InterfaceError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_command(Command::void(name, body))
    }

    pub fn add_command_write<T, F>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> Result<Arc<Command>, InterfaceError>
    where
        T: Argument,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.add_command(Command::write(name, body))
    }

    pub fn add_command_read<T, F>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> Result<Arc<Command>, InterfaceError>
    where
        T: Argument,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        self.add_command(Command::read(name, body))
    }

    pub fn add_command_qualified_read<Q, T, F>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> Result<Arc<Command>, InterfaceError>
    where
        Q: Argument,
        T: Argument,
        F: Fn(&Q, &mut T) + Send + Sync + 'static,
    {
        self.add_command(Command::qualified_read(name, body))
    }

    /// Adds an event without payload
    pub fn add_event_void(
        &self,
        name: impl Into<String>,
    ) -> Result<Arc<EventGenerator>, InterfaceError> {
        self.insert_event(EventGenerator::void(name))
    }

    /// Adds an event carrying a `T`
    pub fn add_event_write<T: Argument>(
        &self,
        name: impl Into<String>,
    ) -> Result<Arc<EventGenerator>, InterfaceError> {
        self.insert_event(EventGenerator::write::<T>(name))
    }

    /// Binds `handler` to the named event's observer list
    pub fn add_observer(&self, event: &str, handler: Arc<Command>) -> Result<(), InterfaceError> {
        let generator = self.event(event)?;
        generator.add_observer(handler)?;
        Ok(())
    }

    /// Removes `handler` from the named event's observer list
    pub fn remove_observer(
        &self,
        event: &str,
        handler: &Arc<Command>,
    ) -> Result<bool, InterfaceError> {
        Ok(self.event(event)?.remove_observer(handler))
    }

    /// Returns the interface a given user should call
    ///
    /// On an end-user interface this returns the interface itself. On a
    /// factory it creates a new clone with its own mailbox; each user name
    /// may only be used once per factory.
    pub fn get_end_user_interface(
        self: &Arc<Self>,
        user: &str,
    ) -> Result<Arc<ProvidedInterface>, InterfaceError> {
        let (end_users, spawned) = match &self.role {
            Role::EndUser { .. } => return Ok(Arc::clone(self)),
            Role::Factory { end_users, spawned } => (end_users, spawned),
        };

        let mut end_users = end_users.write();
        if end_users.contains_key(user) {
            return Err(InterfaceError::DuplicateUser {
                interface: self.name.clone(),
                user: user.to_string(),
            });
        }

        let name = end_user_interface_name(&self.name, user);
        let mailbox = Arc::new(Mailbox::new(name.clone(), self.mailbox_size));
        let wake = self.wake.read().clone();
        mailbox.set_wake_signal(wake.clone());

        let commands = self
            .commands
            .read()
            .iter()
            .map(|(command_name, command)| {
                (command_name.clone(), command.clone_for_mailbox(&mailbox))
            })
            .collect();
        let events = self.events.read().clone();

        let end_user = Arc::new(ProvidedInterface {
            name,
            factory_name: self.name.clone(),
            component: self.component.clone(),
            policy: self.policy,
            mailbox_size: self.mailbox_size,
            commands: RwLock::new(commands),
            events: RwLock::new(events),
            wake: RwLock::new(wake),
            role: Role::EndUser {
                user: user.to_string(),
                mailbox,
            },
        });
        end_users.insert(user.to_string(), Arc::clone(&end_user));
        spawned.store(true, Ordering::Release);
        debug!(
            component = %self.component,
            interface = %self.name,
            user,
            "created end-user interface"
        );
        Ok(end_user)
    }

    /// Forgets an end-user clone; its mailbox goes away with the last handle
    pub fn remove_end_user_interface(
        &self,
        user: &str,
    ) -> Result<Arc<ProvidedInterface>, InterfaceError> {
        let end_users = self.end_users("remove_end_user_interface")?;
        let removed = end_users.write().remove(user);
        removed.ok_or_else(|| InterfaceError::UserNotFound {
            interface: self.name.clone(),
            user: user.to_string(),
        })
    }

    /// Returns an existing end-user clone
    pub fn find_end_user_interface(&self, user: &str) -> Option<Arc<ProvidedInterface>> {
        match &self.role {
            Role::Factory { end_users, .. } => end_users.read().get(user).cloned(),
            Role::EndUser { .. } => None,
        }
    }

    /// Names of the users that hold a clone of this factory
    pub fn end_user_names(&self) -> Vec<String> {
        match &self.role {
            Role::Factory { end_users, .. } => end_users.read().keys().cloned().collect(),
            Role::EndUser { .. } => Vec::new(),
        }
    }

    pub fn end_user_count(&self) -> usize {
        match &self.role {
            Role::Factory { end_users, .. } => end_users.read().len(),
            Role::EndUser { .. } => 0,
        }
    }

    /// End-user clones currently alive
    pub fn end_user_interfaces(&self) -> Vec<Arc<ProvidedInterface>> {
        match &self.role {
            Role::Factory { end_users, .. } => end_users.read().values().cloned().collect(),
            Role::EndUser { .. } => Vec::new(),
        }
    }

    /// Looks up a command to invoke; only end-user interfaces are invocable
    pub fn command(&self, name: &str) -> Result<Arc<Command>, InterfaceError> {
        if self.is_factory() {
            return Err(InterfaceError::NotEndUser {
                interface: self.name.clone(),
                operation: "command",
            });
        }
        self.commands
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| InterfaceError::CommandNotFound {
                interface: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Looks up an event generator (shared between factory and clones)
    pub fn event(&self, name: &str) -> Result<Arc<EventGenerator>, InterfaceError> {
        self.events
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| InterfaceError::EventNotFound {
                interface: self.name.clone(),
                name: name.to_string(),
            })
    }

    pub fn command_names(&self) -> Vec<String> {
        self.commands.read().keys().cloned().collect()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events.read().keys().cloned().collect()
    }

    /// Signature of a command, e.g. `QueuedWrite(f64)`
    pub fn command_description(&self, name: &str) -> Result<String, InterfaceError> {
        self.commands
            .read()
            .get(name)
            .map(|command| command.description())
            .ok_or_else(|| InterfaceError::CommandNotFound {
                interface: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Signature of an event, e.g. `Write(f64)`
    pub fn event_description(&self, name: &str) -> Result<String, InterfaceError> {
        Ok(self.event(name)?.description())
    }

    /// Executes every pending invocation in this end-user's mailbox
    pub fn process_mailbox(&self) -> Result<usize, InterfaceError> {
        match &self.role {
            Role::EndUser { mailbox, .. } => Ok(mailbox.drain()),
            Role::Factory { .. } => Err(InterfaceError::NotEndUser {
                interface: self.name.clone(),
                operation: "process_mailbox",
            }),
        }
    }

    /// Signal raised whenever any mailbox of this interface receives work
    ///
    /// Applies to existing and future end-user clones.
    pub fn set_wake_signal(&self, signal: Option<Signal>) {
        *self.wake.write() = signal.clone();
        match &self.role {
            Role::Factory { end_users, .. } => {
                for end_user in end_users.read().values() {
                    end_user.set_wake_signal(signal.clone());
                }
            }
            Role::EndUser { mailbox, .. } => mailbox.set_wake_signal(signal),
        }
    }

    fn insert_command(&self, command: Command) -> Result<Arc<Command>, InterfaceError> {
        let end_users = self.end_users("add_command")?;
        // Held across the insert so no clone is created concurrently.
        let _end_users = end_users.read();
        if self.has_spawned() {
            return Err(InterfaceError::FactoryFrozen {
                interface: self.name.clone(),
            });
        }
        let mut commands = self.commands.write();
        if commands.contains_key(command.name()) {
            return Err(InterfaceError::DuplicateCommand {
                interface: self.name.clone(),
                name: command.name().to_string(),
            });
        }
        let command = Arc::new(command);
        commands.insert(command.name().to_string(), Arc::clone(&command));
        Ok(command)
    }

    fn insert_event(&self, event: EventGenerator) -> Result<Arc<EventGenerator>, InterfaceError> {
        let end_users = self.end_users("add_event")?;
        let _end_users = end_users.read();
        if self.has_spawned() {
            return Err(InterfaceError::FactoryFrozen {
                interface: self.name.clone(),
            });
        }
        let mut events = self.events.write();
        if events.contains_key(event.name()) {
            return Err(InterfaceError::DuplicateEvent {
                interface: self.name.clone(),
                name: event.name().to_string(),
            });
        }
        let event = Arc::new(event);
        events.insert(event.name().to_string(), Arc::clone(&event));
        Ok(event)
    }

    fn has_spawned(&self) -> bool {
        match &self.role {
            Role::Factory { spawned, .. } => spawned.load(Ordering::Acquire),
            Role::EndUser { .. } => false,
        }
    }

    fn end_users(
        &self,
        operation: &'static str,
    ) -> Result<&RwLock<BTreeMap<String, Arc<ProvidedInterface>>>, InterfaceError> {
        match &self.role {
            Role::Factory { end_users, .. } => Ok(end_users),
            Role::EndUser { .. } => Err(InterfaceError::NotFactory {
                interface: self.name.clone(),
                operation,
            }),
        }
    }
}

impl std::fmt::Debug for ProvidedInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvidedInterface")
            .field("name", &self.name)
            .field("component", &self.component)
            .field("policy", &self.policy)
            .field("factory", &self.is_factory())
            .field("commands", &self.command_names())
            .field("events", &self.event_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ErrorKind;
    use ipc::ExecutionResult;
    use parking_lot::Mutex;

    fn server() -> (Arc<ProvidedInterface>, Arc<Mutex<Vec<i32>>>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let interface = Arc::new(ProvidedInterface::new(
            "C1",
            "Server",
            QueuingPolicy::CommandsQueued,
            4,
        ));
        let sink = Arc::clone(&log);
        interface
            .add_command_write("Push", move |value: &i32| sink.lock().push(*value))
            .unwrap();
        interface
            .add_command_read("Count", |out: &mut usize| *out = 0)
            .unwrap();
        interface.add_event_write::<i32>("Pushed").unwrap();
        (interface, log)
    }

    #[test]
    fn test_policy_resolves_command_kind() {
        let (interface, _) = server();
        assert_eq!(
            interface.command_description("Push").unwrap(),
            "QueuedWrite(i32)"
        );
        assert_eq!(
            interface.command_description("Count").unwrap(),
            "Read(usize)"
        );

        let direct = ProvidedInterface::new("C1", "Direct", QueuingPolicy::CommandsNotQueued, 4);
        let command = direct.add_command_void("Reset", || {}).unwrap();
        assert_eq!(command.kind(), CommandKind::DirectVoid);
    }

    #[test]
    fn test_duplicate_names_fail_closed() {
        let (interface, _) = server();
        let err = interface.add_command_void("Push", || {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);
        assert_eq!(
            interface.command_description("Push").unwrap(),
            "QueuedWrite(i32)"
        );
        assert!(interface.add_event_void("Pushed").is_err());
    }

    #[test]
    fn test_clone_isolation() {
        let (factory, log) = server();
        let first = factory.get_end_user_interface("ClientA").unwrap();
        let second = factory.get_end_user_interface("ClientB").unwrap();

        let first_box = first.mailbox().unwrap();
        let second_box = second.mailbox().unwrap();
        assert_ne!(first_box.id(), second_box.id());

        let result = first.command("Push").unwrap().execute_write(&1i32).unwrap();
        assert_eq!(result, ExecutionResult::Queued);
        assert_eq!(first_box.len(), 1);
        assert!(second_box.is_empty());

        assert_eq!(second.process_mailbox().unwrap(), 0);
        assert!(log.lock().is_empty());
        assert_eq!(first.process_mailbox().unwrap(), 1);
        assert_eq!(*log.lock(), vec![1]);
    }

    #[test]
    fn test_end_user_retrieval_is_idempotent() {
        let (factory, _) = server();
        let end_user = factory.get_end_user_interface("ClientA").unwrap();
        let again = end_user.get_end_user_interface("Other").unwrap();
        assert!(Arc::ptr_eq(&end_user, &again));
        assert_eq!(
            end_user.mailbox().unwrap().id(),
            again.mailbox().unwrap().id()
        );
        assert_eq!(end_user.name(), "Server[ClientA]");
        assert_eq!(end_user.user_name(), Some("ClientA"));
        assert_eq!(factory.end_user_count(), 1);
    }

    #[test]
    fn test_duplicate_user_on_factory() {
        let (factory, _) = server();
        factory.get_end_user_interface("ClientA").unwrap();
        let err = factory.get_end_user_interface("ClientA").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);
        assert_eq!(factory.end_user_names(), vec!["ClientA".to_string()]);
    }

    #[test]
    fn test_read_commands_and_events_are_shared() {
        let (factory, _) = server();
        let first = factory.get_end_user_interface("ClientA").unwrap();
        let second = factory.get_end_user_interface("ClientB").unwrap();

        assert!(Arc::ptr_eq(
            &first.command("Count").unwrap(),
            &second.command("Count").unwrap()
        ));
        assert!(!Arc::ptr_eq(
            &first.command("Push").unwrap(),
            &second.command("Push").unwrap()
        ));
        assert!(Arc::ptr_eq(
            &first.event("Pushed").unwrap(),
            &factory.event("Pushed").unwrap()
        ));
    }

    #[test]
    fn test_factory_policy_violations() {
        let (factory, _) = server();
        assert_eq!(
            factory.process_mailbox().unwrap_err().kind(),
            ErrorKind::PolicyViolation
        );
        assert_eq!(
            factory.command("Push").unwrap_err().kind(),
            ErrorKind::PolicyViolation
        );

        factory.get_end_user_interface("ClientA").unwrap();
        let err = factory.add_command_void("Late", || {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    }

    #[test]
    fn test_end_user_cannot_add_commands() {
        let (factory, _) = server();
        let end_user = factory.get_end_user_interface("ClientA").unwrap();
        let err = end_user.add_command_void("Extra", || {}).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    }

    #[test]
    fn test_add_observer_unknown_event() {
        let (factory, _) = server();
        let handler = Arc::new(Command::void("Handler", || {}));
        let err = factory.add_observer("Missing", handler).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_remove_end_user_interface() {
        let (factory, _) = server();
        factory.get_end_user_interface("ClientA").unwrap();
        factory.remove_end_user_interface("ClientA").unwrap();
        assert_eq!(factory.end_user_count(), 0);
        assert_eq!(
            factory
                .remove_end_user_interface("ClientA")
                .unwrap_err()
                .kind(),
            ErrorKind::NotFound
        );
        // The same user may connect again once removed.
        assert!(factory.get_end_user_interface("ClientA").is_ok());
    }

    #[test]
    fn test_factory_stays_frozen_after_clones_removed() {
        let (factory, _) = server();
        factory.get_end_user_interface("ClientA").unwrap();
        factory.remove_end_user_interface("ClientA").unwrap();
        assert_eq!(factory.end_user_count(), 0);

        let err = factory.add_command_void("Late", || {}).unwrap_err();
        assert!(matches!(err, InterfaceError::FactoryFrozen { .. }));
        assert!(!factory.command_names().contains(&"Late".to_string()));
    }

    #[test]
    fn test_wake_signal_reaches_clones() {
        let (factory, _) = server();
        let wake = Signal::new();
        factory.set_wake_signal(Some(wake.clone()));
        let end_user = factory.get_end_user_interface("ClientA").unwrap();

        end_user
            .command("Push")
            .unwrap()
            .execute_write(&5i32)
            .unwrap();
        assert!(wake.is_raised());
    }
}
