//! Event generators
//!
//! An event is a multicast command: generating it invokes every observer in
//! registration order. Delivery is best effort. A failing observer does not
//! stop the others; failures come back in a [`FanOutReport`].

use crate::{Argument, ArgumentPrototype, Command, IpcError, SignatureClass};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Observer that failed during fan-out
#[derive(Debug)]
pub struct ObserverFailure {
    pub observer: String,
    pub error: IpcError,
}

/// Result of one event generation
#[derive(Debug, Default)]
pub struct FanOutReport {
    /// Observers that accepted the event (executed or queued)
    pub delivered: usize,
    pub failures: Vec<ObserverFailure>,
}

impl FanOutReport {
    /// Returns true if every observer accepted the event
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Multicast source of a void or write event
pub struct EventGenerator {
    name: String,
    signature: SignatureClass,
    argument: Option<ArgumentPrototype>,
    observers: RwLock<Vec<Arc<Command>>>,
}

impl EventGenerator {
    /// Creates an event without payload
    pub fn void(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: SignatureClass::Void,
            argument: None,
            observers: RwLock::new(Vec::new()),
        }
    }

    /// Creates an event carrying a `T`
    pub fn write<T: Argument>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signature: SignatureClass::Write,
            argument: Some(ArgumentPrototype::of::<T>()),
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn signature(&self) -> SignatureClass {
        self.signature
    }

    pub fn argument_prototype(&self) -> Option<ArgumentPrototype> {
        self.argument
    }

    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Human-readable signature, e.g. `Write(f64)`
    pub fn description(&self) -> String {
        match self.argument {
            Some(argument) => format!("{}({})", self.signature, argument),
            None => format!("{}()", self.signature),
        }
    }

    /// Adds an observer; its signature must match the event's
    pub fn add_observer(&self, handler: Arc<Command>) -> Result<(), IpcError> {
        if handler.signature() != self.signature {
            return Err(IpcError::SignatureMismatch {
                command: handler.name().to_string(),
                actual: handler.signature(),
                attempted: self.signature,
            });
        }
        if handler.argument_prototype() != self.argument {
            return Err(IpcError::TypeMismatch {
                command: handler.name().to_string(),
                expected: self
                    .argument
                    .map(|prototype| prototype.type_name())
                    .unwrap_or("()"),
                actual: handler
                    .argument_prototype()
                    .map(|prototype| prototype.type_name())
                    .unwrap_or("()"),
            });
        }
        self.observers.write().push(handler);
        Ok(())
    }

    /// Removes a previously added observer
    pub fn remove_observer(&self, handler: &Arc<Command>) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|observer| !Arc::ptr_eq(observer, handler));
        observers.len() != before
    }

    /// Generates a void event
    pub fn generate(&self) -> Result<FanOutReport, IpcError> {
        if self.signature != SignatureClass::Void {
            return Err(IpcError::SignatureMismatch {
                command: self.name.clone(),
                actual: self.signature,
                attempted: SignatureClass::Void,
            });
        }
        Ok(self.fan_out(|observer| observer.execute_void().map(|_| ())))
    }

    /// Generates a write event carrying `argument`
    pub fn generate_write(&self, argument: &dyn Argument) -> Result<FanOutReport, IpcError> {
        match self.argument {
            Some(prototype) if prototype.matches(argument) => {
                Ok(self.fan_out(|observer| observer.execute_write(argument).map(|_| ())))
            }
            Some(prototype) => Err(IpcError::TypeMismatch {
                command: self.name.clone(),
                expected: prototype.type_name(),
                actual: argument.type_name(),
            }),
            None => Err(IpcError::SignatureMismatch {
                command: self.name.clone(),
                actual: self.signature,
                attempted: SignatureClass::Write,
            }),
        }
    }

    fn fan_out<F>(&self, invoke: F) -> FanOutReport
    where
        F: Fn(&Command) -> Result<(), IpcError>,
    {
        // Snapshot so observers can be added or removed during delivery.
        let observers: Vec<Arc<Command>> = self.observers.read().clone();
        let mut report = FanOutReport::default();
        for observer in observers {
            match invoke(observer.as_ref()) {
                Ok(()) => report.delivered += 1,
                Err(error) => {
                    warn!(event = %self.name, observer = observer.name(), %error, "event delivery failed");
                    report.failures.push(ObserverFailure {
                        observer: observer.name().to_string(),
                        error,
                    });
                }
            }
        }
        report
    }
}

impl fmt::Debug for EventGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventGenerator")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Mailbox;
    use core_types::ErrorKind;
    use parking_lot::Mutex;

    #[test]
    fn test_fan_out_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let event = EventGenerator::write::<i32>("ValueChanged");
        for tag in ["first", "second", "third"] {
            let sink = Arc::clone(&log);
            event
                .add_observer(Arc::new(Command::write(tag, move |value: &i32| {
                    sink.lock().push((tag, *value))
                })))
                .unwrap();
        }

        let report = event.generate_write(&7i32).unwrap();
        assert!(report.is_complete());
        assert_eq!(report.delivered, 3);
        assert_eq!(
            *log.lock(),
            vec![("first", 7), ("second", 7), ("third", 7)]
        );
    }

    #[test]
    fn test_failing_observer_does_not_block_others() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let event = EventGenerator::void("Tick");

        let sink = Arc::clone(&log);
        event
            .add_observer(Arc::new(Command::void("before", move || sink.lock().push("before"))))
            .unwrap();

        // Queued observer whose mailbox is already full.
        let full = Arc::new(Mailbox::new("full", 1));
        let stuck = Command::void("stuck", || {})
            .into_queued()
            .unwrap()
            .with_mailbox(Arc::clone(&full));
        stuck.execute_void().unwrap();
        event.add_observer(Arc::new(stuck)).unwrap();

        let sink = Arc::clone(&log);
        event
            .add_observer(Arc::new(Command::void("after", move || sink.lock().push("after"))))
            .unwrap();

        let report = event.generate().unwrap();
        assert_eq!(report.delivered, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].observer, "stuck");
        assert_eq!(report.failures[0].error.kind(), ErrorKind::QueueOverflow);
        assert_eq!(*log.lock(), vec!["before", "after"]);
    }

    #[test]
    fn test_observer_signature_must_match() {
        let event = EventGenerator::write::<f64>("Position");
        let void_handler = Arc::new(Command::void("Handler", || {}));
        assert!(event.add_observer(void_handler).is_err());

        let wrong_type = Arc::new(Command::write("Handler", |_: &i32| {}));
        assert_eq!(
            event.add_observer(wrong_type).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );
        assert_eq!(event.observer_count(), 0);
    }

    #[test]
    fn test_generate_with_wrong_payload() {
        let event = EventGenerator::write::<f64>("Position");
        assert!(event.generate_write(&1i32).is_err());
        assert!(event.generate().is_err());
    }

    #[test]
    fn test_remove_observer() {
        let event = EventGenerator::void("Tick");
        let handler = Arc::new(Command::void("Handler", || {}));
        event.add_observer(Arc::clone(&handler)).unwrap();
        assert_eq!(event.observer_count(), 1);
        assert!(event.remove_observer(&handler));
        assert!(!event.remove_observer(&handler));
        assert_eq!(event.generate().unwrap().delivered, 0);
    }
}
