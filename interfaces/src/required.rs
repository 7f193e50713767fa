//! Required interfaces
//!
//! A required interface declares the functions a component wants to call and
//! the events it wants to hear about. Event handlers are queued in the
//! interface's own mailbox and run when the owning component drains it.

use crate::function::FunctionCell;
use crate::{
    FunctionQualifiedRead, FunctionRead, FunctionVoid, FunctionWrite, InterfaceError,
    ProvidedInterface,
};
use ipc::{Argument, ArgumentPrototype, Command, Mailbox, SignatureClass};
use lifecycle::Signal;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Named bundle of function handles and event handlers
pub struct RequiredInterface {
    name: String,
    component: String,
    functions: RwLock<BTreeMap<String, Arc<FunctionCell>>>,
    handlers: RwLock<BTreeMap<String, Arc<Command>>>,
    mailbox: Arc<Mailbox>,
    connected: RwLock<Option<Arc<ProvidedInterface>>>,
}

impl RequiredInterface {
    /// Creates a required interface whose event mailbox holds `mailbox_size`
    pub fn new(component: impl Into<String>, name: impl Into<String>, mailbox_size: usize) -> Self {
        let component = component.into();
        let name = name.into();
        let mailbox = Arc::new(Mailbox::new(format!("{}.{}", component, name), mailbox_size));
        Self {
            name,
            component,
            functions: RwLock::new(BTreeMap::new()),
            handlers: RwLock::new(BTreeMap::new()),
            mailbox,
            connected: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn component_name(&self) -> &str {
        &self.component
    }

    /// Mailbox holding queued event deliveries
    pub fn mailbox(&self) -> &Arc<Mailbox> {
        &self.mailbox
    }

    pub fn add_function_void(&self, name: impl Into<String>) -> Result<FunctionVoid, InterfaceError> {
        let cell = self.insert_function(name.into(), SignatureClass::Void, None, None)?;
        Ok(FunctionVoid::new(cell))
    }

    pub fn add_function_write<T: Argument>(
        &self,
        name: impl Into<String>,
    ) -> Result<FunctionWrite<T>, InterfaceError> {
        let cell = self.insert_function(
            name.into(),
            SignatureClass::Write,
            Some(ArgumentPrototype::of::<T>()),
            None,
        )?;
        Ok(FunctionWrite::new(cell))
    }

    pub fn add_function_read<T: Argument>(
        &self,
        name: impl Into<String>,
    ) -> Result<FunctionRead<T>, InterfaceError> {
        let cell = self.insert_function(
            name.into(),
            SignatureClass::Read,
            Some(ArgumentPrototype::of::<T>()),
            None,
        )?;
        Ok(FunctionRead::new(cell))
    }

    pub fn add_function_qualified_read<Q: Argument, T: Argument>(
        &self,
        name: impl Into<String>,
    ) -> Result<FunctionQualifiedRead<Q, T>, InterfaceError> {
        let cell = self.insert_function(
            name.into(),
            SignatureClass::QualifiedRead,
            Some(ArgumentPrototype::of::<T>()),
            Some(ArgumentPrototype::of::<Q>()),
        )?;
        Ok(FunctionQualifiedRead::new(cell))
    }

    /// Handles a void event of the connected provided interface
    pub fn add_event_handler_void<F>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> Result<Arc<Command>, InterfaceError>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.insert_handler(Command::void(name, body))
    }

    /// Handles a write event of the connected provided interface
    pub fn add_event_handler_write<T, F>(
        &self,
        name: impl Into<String>,
        body: F,
    ) -> Result<Arc<Command>, InterfaceError>
    where
        T: Argument,
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.insert_handler(Command::write(name, body))
    }

    pub fn function_names(&self) -> Vec<String> {
        self.functions.read().keys().cloned().collect()
    }

    pub fn event_handler_names(&self) -> Vec<String> {
        self.handlers.read().keys().cloned().collect()
    }

    /// Declared signature of a function, e.g. `Write(f64)`
    pub fn function_description(&self, name: &str) -> Option<String> {
        self.functions.read().get(name).map(|cell| cell.description())
    }

    /// Signature of an event handler, e.g. `QueuedWrite(f64)`
    pub fn event_handler_description(&self, name: &str) -> Option<String> {
        self.handlers.read().get(name).map(|handler| handler.description())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.read().is_some()
    }

    /// The end-user interface this interface is bound to
    pub fn connected_interface(&self) -> Option<Arc<ProvidedInterface>> {
        self.connected.read().clone()
    }

    /// Binds every function and event handler to `provided`
    ///
    /// `provided` must be an end-user interface. All functions are checked
    /// before anything is bound, so a failed bind leaves no handle
    /// connected. Event handlers without a matching event are skipped.
    pub fn bind(&self, provided: &Arc<ProvidedInterface>) -> Result<(), InterfaceError> {
        if provided.is_factory() {
            return Err(InterfaceError::NotEndUser {
                interface: provided.name().to_string(),
                operation: "bind",
            });
        }

        let mut connected = self.connected.write();
        if let Some(current) = connected.as_ref() {
            return Err(InterfaceError::AlreadyBound {
                interface: self.name.clone(),
                provided: current.name().to_string(),
            });
        }

        let functions = self.functions.read();
        let handlers = self.handlers.read();

        let mut targets = Vec::with_capacity(functions.len());
        for (name, cell) in functions.iter() {
            let command = provided.command(name)?;
            cell.check(&command)?;
            targets.push((Arc::clone(cell), command));
        }

        let mut observed = Vec::with_capacity(handlers.len());
        for (name, handler) in handlers.iter() {
            match provided.event(name) {
                Ok(event) => {
                    if event.signature() != handler.signature()
                        || event.argument_prototype() != handler.argument_prototype()
                    {
                        return Err(InterfaceError::Incompatible {
                            function: name.clone(),
                            expected: handler.description(),
                            actual: event.description(),
                        });
                    }
                    observed.push((event, Arc::clone(handler)));
                }
                Err(_) => {
                    warn!(
                        component = %self.component,
                        interface = %self.name,
                        event = %name,
                        provided = provided.name(),
                        "event handler has no matching event"
                    );
                }
            }
        }

        for (cell, command) in targets {
            cell.bind(command);
        }
        for (event, handler) in observed {
            event.add_observer(handler)?;
        }
        *connected = Some(Arc::clone(provided));
        debug!(
            component = %self.component,
            interface = %self.name,
            provided = provided.name(),
            "required interface bound"
        );
        Ok(())
    }

    /// Disconnects every function and event handler
    ///
    /// Returns the interface that was bound.
    pub fn unbind(&self) -> Result<Arc<ProvidedInterface>, InterfaceError> {
        let mut connected = self.connected.write();
        let provided = connected.take().ok_or_else(|| InterfaceError::NotBound {
            interface: self.name.clone(),
        })?;

        for cell in self.functions.read().values() {
            cell.unbind();
        }
        for (name, handler) in self.handlers.read().iter() {
            if let Ok(event) = provided.event(name) {
                event.remove_observer(handler);
            }
        }
        debug!(
            component = %self.component,
            interface = %self.name,
            provided = provided.name(),
            "required interface unbound"
        );
        Ok(provided)
    }

    /// Runs every queued event delivery
    pub fn process_mailbox(&self) -> usize {
        self.mailbox.drain()
    }

    /// Signal raised when an event delivery is queued
    pub fn set_wake_signal(&self, signal: Option<Signal>) {
        self.mailbox.set_wake_signal(signal);
    }

    fn insert_function(
        &self,
        name: String,
        signature: SignatureClass,
        argument: Option<ArgumentPrototype>,
        qualifier: Option<ArgumentPrototype>,
    ) -> Result<Arc<FunctionCell>, InterfaceError> {
        let mut functions = self.functions.write();
        if functions.contains_key(&name) {
            return Err(InterfaceError::DuplicateFunction {
                interface: self.name.clone(),
                name,
            });
        }
        let cell = Arc::new(FunctionCell::new(name.clone(), signature, argument, qualifier));
        functions.insert(name, Arc::clone(&cell));
        Ok(cell)
    }

    fn insert_handler(&self, handler: Command) -> Result<Arc<Command>, InterfaceError> {
        let mut handlers = self.handlers.write();
        if handlers.contains_key(handler.name()) {
            return Err(InterfaceError::DuplicateEventHandler {
                interface: self.name.clone(),
                name: handler.name().to_string(),
            });
        }
        let handler = Arc::new(handler.into_queued()?.with_mailbox(Arc::clone(&self.mailbox)));
        handlers.insert(handler.name().to_string(), Arc::clone(&handler));
        Ok(handler)
    }
}

impl std::fmt::Debug for RequiredInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequiredInterface")
            .field("name", &self.name)
            .field("component", &self.component)
            .field("functions", &self.function_names())
            .field("event_handlers", &self.event_handler_names())
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::QueuingPolicy;
    use core_types::ErrorKind;
    use ipc::ExecutionResult;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct Fixture {
        factory: Arc<ProvidedInterface>,
        received: Arc<Mutex<Vec<f64>>>,
    }

    fn fixture() -> Fixture {
        let received = Arc::new(Mutex::new(Vec::new()));
        let factory = Arc::new(ProvidedInterface::new(
            "Robot",
            "Control",
            QueuingPolicy::CommandsQueued,
            8,
        ));
        let sink = Arc::clone(&received);
        factory
            .add_command_write("SetPosition", move |value: &f64| sink.lock().push(*value))
            .unwrap();
        factory.add_command_void("Home", || {}).unwrap();
        factory
            .add_command_read("GetPosition", |out: &mut f64| *out = 1.25)
            .unwrap();
        factory
            .add_command_qualified_read("Scale", |q: &f64, out: &mut f64| *out = *q * 2.0)
            .unwrap();
        factory.add_event_write::<f64>("PositionChanged").unwrap();
        Fixture { factory, received }
    }

    #[test]
    fn test_unbound_function_reports_error() {
        let required = RequiredInterface::new("Client", "Robot", 8);
        let home = required.add_function_void("Home").unwrap();
        assert!(!home.is_bound());
        assert_eq!(home.call().unwrap_err().kind(), ErrorKind::Unbound);
    }

    #[test]
    fn test_bind_and_call() {
        let fixture = fixture();
        let required = RequiredInterface::new("Client", "Robot", 8);
        let set = required.add_function_write::<f64>("SetPosition").unwrap();
        let get = required.add_function_read::<f64>("GetPosition").unwrap();
        let scale = required
            .add_function_qualified_read::<f64, f64>("Scale")
            .unwrap();

        let end_user = fixture.factory.get_end_user_interface("Client").unwrap();
        required.bind(&end_user).unwrap();
        assert!(required.is_connected());

        assert_eq!(set.call(&3.5).unwrap(), ExecutionResult::Queued);
        assert!(fixture.received.lock().is_empty());
        end_user.process_mailbox().unwrap();
        assert_eq!(*fixture.received.lock(), vec![3.5]);

        assert_eq!(get.get().unwrap(), 1.25);
        assert_eq!(scale.get(&4.0).unwrap(), 8.0);
    }

    #[test]
    fn test_bind_requires_end_user() {
        let fixture = fixture();
        let required = RequiredInterface::new("Client", "Robot", 8);
        let err = required.bind(&fixture.factory).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    }

    #[test]
    fn test_failed_bind_leaves_nothing_connected() {
        let fixture = fixture();
        let required = RequiredInterface::new("Client", "Robot", 8);
        let home = required.add_function_void("Home").unwrap();
        required.add_function_void("Missing").unwrap();

        let end_user = fixture.factory.get_end_user_interface("Client").unwrap();
        let err = required.bind(&end_user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(!home.is_bound());
        assert!(!required.is_connected());
    }

    #[test]
    fn test_incompatible_function_type() {
        let fixture = fixture();
        let required = RequiredInterface::new("Client", "Robot", 8);
        required.add_function_write::<i32>("SetPosition").unwrap();

        let end_user = fixture.factory.get_end_user_interface("Client").unwrap();
        let err = required.bind(&end_user).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_bind_twice_is_rejected() {
        let fixture = fixture();
        let required = RequiredInterface::new("Client", "Robot", 8);
        let first = fixture.factory.get_end_user_interface("Client").unwrap();
        let second = fixture.factory.get_end_user_interface("Other").unwrap();
        required.bind(&first).unwrap();
        let err = required.bind(&second).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyConnected);
    }

    #[test]
    fn test_event_handlers_are_queued_locally() {
        let fixture = fixture();
        let required = RequiredInterface::new("Client", "Robot", 8);
        let heard = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&heard);
        required
            .add_event_handler_write("PositionChanged", move |value: &f64| {
                sink.lock().push(*value)
            })
            .unwrap();
        required.add_event_handler_void("NoSuchEvent", || {}).unwrap();

        let end_user = fixture.factory.get_end_user_interface("Client").unwrap();
        required.bind(&end_user).unwrap();

        let event = fixture.factory.event("PositionChanged").unwrap();
        let report = event.generate_write(&2.0f64).unwrap();
        assert_eq!(report.delivered, 1);
        assert!(heard.lock().is_empty());

        assert_eq!(required.process_mailbox(), 1);
        assert_eq!(*heard.lock(), vec![2.0]);
    }

    #[test]
    fn test_unbind_disconnects_everything() {
        let fixture = fixture();
        let required = RequiredInterface::new("Client", "Robot", 8);
        let home = required.add_function_void("Home").unwrap();
        required
            .add_event_handler_write("PositionChanged", |_: &f64| {})
            .unwrap();

        let end_user = fixture.factory.get_end_user_interface("Client").unwrap();
        required.bind(&end_user).unwrap();
        let event = fixture.factory.event("PositionChanged").unwrap();
        assert_eq!(event.observer_count(), 1);

        let unbound = required.unbind().unwrap();
        assert!(Arc::ptr_eq(&unbound, &end_user));
        assert!(!home.is_bound());
        assert_eq!(event.observer_count(), 0);
        assert_eq!(required.unbind().unwrap_err().kind(), ErrorKind::NotConnected);
    }

    #[test]
    fn test_blocking_call_times_out_without_consumer() {
        let fixture = fixture();
        let required = RequiredInterface::new("Client", "Robot", 8);
        let home = required.add_function_void("Home").unwrap();
        let end_user = fixture.factory.get_end_user_interface("Client").unwrap();
        required.bind(&end_user).unwrap();

        let err = home.call_blocking(Duration::from_millis(10)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[test]
    fn test_duplicate_function_names() {
        let required = RequiredInterface::new("Client", "Robot", 8);
        required.add_function_void("Home").unwrap();
        let err = required.add_function_void("Home").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NameConflict);
        assert_eq!(required.function_description("Home").unwrap(), "Void()");
    }

    #[test]
    fn test_function_handle_debug() {
        let required = RequiredInterface::new("Client", "Robot", 8);
        let home = required.add_function_void("Home").unwrap();
        let text = format!("{:?}", home);
        assert!(text.contains("Home"));
        assert!(text.contains("bound: false"));
    }
}
