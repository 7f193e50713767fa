//! Commands
//!
//! A command is a named callable with a fixed signature class. Whether an
//! invocation runs immediately or goes through a mailbox is decided once,
//! when the command is registered, and recorded in its [`CommandKind`].

use crate::{Argument, ArgumentPrototype, IpcError, Mailbox};
use core_types::MailboxId;
use lifecycle::Signal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Argument shape of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureClass {
    /// No argument
    Void,
    /// One input argument
    Write,
    /// One output argument
    Read,
    /// One input (qualifier) and one output argument
    QualifiedRead,
}

impl fmt::Display for SignatureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SignatureClass::Void => "Void",
            SignatureClass::Write => "Write",
            SignatureClass::Read => "Read",
            SignatureClass::QualifiedRead => "QualifiedRead",
        };
        write!(f, "{}", label)
    }
}

/// Dispatch variant of a command, fixed at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    DirectVoid,
    QueuedVoid,
    DirectWrite,
    QueuedWrite,
    Read,
    QualifiedRead,
}

impl CommandKind {
    /// Signature class of this kind
    pub fn signature(&self) -> SignatureClass {
        match self {
            CommandKind::DirectVoid | CommandKind::QueuedVoid => SignatureClass::Void,
            CommandKind::DirectWrite | CommandKind::QueuedWrite => SignatureClass::Write,
            CommandKind::Read => SignatureClass::Read,
            CommandKind::QualifiedRead => SignatureClass::QualifiedRead,
        }
    }

    /// Returns true if invocations go through a mailbox
    pub fn is_queued(&self) -> bool {
        matches!(self, CommandKind::QueuedVoid | CommandKind::QueuedWrite)
    }

    /// Queued counterpart; None for kinds that may never be queued
    pub fn queued(&self) -> Option<CommandKind> {
        match self {
            CommandKind::DirectVoid | CommandKind::QueuedVoid => Some(CommandKind::QueuedVoid),
            CommandKind::DirectWrite | CommandKind::QueuedWrite => Some(CommandKind::QueuedWrite),
            CommandKind::Read | CommandKind::QualifiedRead => None,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Outcome of a successful void or write invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionResult {
    /// The body ran on the calling thread
    Executed,
    /// The invocation was accepted by the command's mailbox
    Queued,
}

pub(crate) type VoidBody = Arc<dyn Fn() + Send + Sync>;
// Typed bodies return false when the argument has the wrong concrete type.
pub(crate) type WriteBody = Arc<dyn Fn(&dyn Argument) -> bool + Send + Sync>;
type ReadBody = Arc<dyn Fn(&mut dyn Argument) -> bool + Send + Sync>;
type QualifiedReadBody = Arc<dyn Fn(&dyn Argument, &mut dyn Argument) -> bool + Send + Sync>;

#[derive(Clone)]
enum Body {
    Void(VoidBody),
    Write(WriteBody),
    Read(ReadBody),
    QualifiedRead(QualifiedReadBody),
}

/// A named, typed callable owned by an interface
///
/// # Examples
///
/// ```
/// use ipc::{Command, ExecutionResult};
/// use std::sync::atomic::{AtomicI32, Ordering};
/// use std::sync::Arc;
///
/// let total = Arc::new(AtomicI32::new(0));
/// let sink = Arc::clone(&total);
/// let add = Command::write("Add", move |value: &i32| {
///     sink.fetch_add(*value, Ordering::SeqCst);
/// });
///
/// assert_eq!(add.execute_write(&5i32).unwrap(), ExecutionResult::Executed);
/// assert_eq!(total.load(Ordering::SeqCst), 5);
/// ```
#[derive(Clone)]
pub struct Command {
    name: String,
    kind: CommandKind,
    body: Body,
    argument: Option<ArgumentPrototype>,
    qualifier: Option<ArgumentPrototype>,
    mailbox: Option<Arc<Mailbox>>,
}

impl Command {
    /// Creates a command without arguments
    pub fn void<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            kind: CommandKind::DirectVoid,
            body: Body::Void(Arc::new(body)),
            argument: None,
            qualifier: None,
            mailbox: None,
        }
    }

    /// Creates a command taking one input argument
    pub fn write<T, F>(name: impl Into<String>, body: F) -> Self
    where
        T: Argument,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let body: WriteBody = Arc::new(move |argument: &dyn Argument| {
            match argument.downcast_ref::<T>() {
                Some(value) => {
                    body(value);
                    true
                }
                None => false,
            }
        });
        Self {
            name: name.into(),
            kind: CommandKind::DirectWrite,
            body: Body::Write(body),
            argument: Some(ArgumentPrototype::of::<T>()),
            qualifier: None,
            mailbox: None,
        }
    }

    /// Creates a command filling one output argument
    ///
    /// Read commands report already-stable state and are never queued.
    pub fn read<T, F>(name: impl Into<String>, body: F) -> Self
    where
        T: Argument,
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let body: ReadBody = Arc::new(move |output: &mut dyn Argument| {
            match output.downcast_mut::<T>() {
                Some(value) => {
                    body(value);
                    true
                }
                None => false,
            }
        });
        Self {
            name: name.into(),
            kind: CommandKind::Read,
            body: Body::Read(body),
            argument: Some(ArgumentPrototype::of::<T>()),
            qualifier: None,
            mailbox: None,
        }
    }

    /// Creates a command filling one output argument given a qualifier
    pub fn qualified_read<Q, T, F>(name: impl Into<String>, body: F) -> Self
    where
        Q: Argument,
        T: Argument,
        F: Fn(&Q, &mut T) + Send + Sync + 'static,
    {
        let body: QualifiedReadBody = Arc::new(
            move |qualifier: &dyn Argument, output: &mut dyn Argument| {
                match (qualifier.downcast_ref::<Q>(), output.downcast_mut::<T>()) {
                    (Some(qualifier), Some(value)) => {
                        body(qualifier, value);
                        true
                    }
                    _ => false,
                }
            },
        );
        Self {
            name: name.into(),
            kind: CommandKind::QualifiedRead,
            body: Body::QualifiedRead(body),
            argument: Some(ArgumentPrototype::of::<T>()),
            qualifier: Some(ArgumentPrototype::of::<Q>()),
            mailbox: None,
        }
    }

    /// Converts a void or write command into its queued variant
    ///
    /// The result has no mailbox until [`Command::with_mailbox`] or
    /// [`Command::clone_for_mailbox`] binds one.
    pub fn into_queued(mut self) -> Result<Self, IpcError> {
        match self.kind.queued() {
            Some(kind) => {
                self.kind = kind;
                Ok(self)
            }
            None => Err(IpcError::NotQueueable {
                command: self.name,
                signature: self.kind.signature(),
            }),
        }
    }

    /// Binds a queued command to `mailbox`
    pub fn with_mailbox(mut self, mailbox: Arc<Mailbox>) -> Self {
        self.mailbox = Some(mailbox);
        self
    }

    /// Produces the command instance used by an end-user interface
    ///
    /// Queued commands get a copy bound to the new mailbox. Direct, read and
    /// qualified read commands are shared.
    pub fn clone_for_mailbox(self: &Arc<Self>, mailbox: &Arc<Mailbox>) -> Arc<Command> {
        match self.kind {
            CommandKind::QueuedVoid | CommandKind::QueuedWrite => Arc::new(Command {
                mailbox: Some(Arc::clone(mailbox)),
                ..Command::clone(self)
            }),
            CommandKind::DirectVoid
            | CommandKind::DirectWrite
            | CommandKind::Read
            | CommandKind::QualifiedRead => Arc::clone(self),
        }
    }

    /// Returns the command name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the dispatch kind
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    /// Returns the signature class
    pub fn signature(&self) -> SignatureClass {
        self.kind.signature()
    }

    /// Returns true if invocations go through a mailbox
    pub fn is_queued(&self) -> bool {
        self.kind.is_queued()
    }

    /// Input type for write commands, output type for reads
    pub fn argument_prototype(&self) -> Option<ArgumentPrototype> {
        self.argument
    }

    /// Qualifier type for qualified reads
    pub fn qualifier_prototype(&self) -> Option<ArgumentPrototype> {
        self.qualifier
    }

    /// Mailbox a queued command is bound to
    pub fn mailbox_id(&self) -> Option<MailboxId> {
        self.mailbox.as_ref().map(|mailbox| mailbox.id())
    }

    /// Human-readable signature, e.g. `QueuedWrite(i32)`
    pub fn description(&self) -> String {
        match (self.qualifier, self.argument) {
            (Some(qualifier), Some(output)) => {
                format!("{}({} -> {})", self.kind, qualifier, output)
            }
            (None, Some(argument)) => format!("{}({})", self.kind, argument),
            _ => format!("{}()", self.kind),
        }
    }

    /// Returns true if `other` has the same signature and argument types
    pub fn is_compatible_with(&self, other: &Command) -> bool {
        self.signature() == other.signature()
            && self.argument == other.argument
            && self.qualifier == other.qualifier
    }

    /// Invokes a void command
    pub fn execute_void(&self) -> Result<ExecutionResult, IpcError> {
        self.dispatch(None, None)
    }

    /// Invokes a write command
    pub fn execute_write(&self, argument: &dyn Argument) -> Result<ExecutionResult, IpcError> {
        self.dispatch(Some(argument), None)
    }

    /// Invokes a void command and waits until it has executed
    pub fn execute_void_blocking(&self, timeout: Duration) -> Result<(), IpcError> {
        self.dispatch_blocking(None, timeout)
    }

    /// Invokes a write command and waits until it has executed
    pub fn execute_write_blocking(
        &self,
        argument: &dyn Argument,
        timeout: Duration,
    ) -> Result<(), IpcError> {
        self.dispatch_blocking(Some(argument), timeout)
    }

    /// Invokes a read command, filling `output`
    pub fn execute_read(&self, output: &mut dyn Argument) -> Result<(), IpcError> {
        self.expect_signature(SignatureClass::Read)?;
        self.check_argument(self.argument, &*output)?;
        if let Body::Read(body) = &self.body {
            if body(output) {
                return Ok(());
            }
        }
        Err(self.type_mismatch(self.argument, &*output))
    }

    /// Invokes a qualified read command, filling `output`
    pub fn execute_qualified_read(
        &self,
        qualifier: &dyn Argument,
        output: &mut dyn Argument,
    ) -> Result<(), IpcError> {
        self.expect_signature(SignatureClass::QualifiedRead)?;
        self.check_argument(self.qualifier, qualifier)?;
        self.check_argument(self.argument, &*output)?;
        if let Body::QualifiedRead(body) = &self.body {
            if body(qualifier, output) {
                return Ok(());
            }
        }
        Err(self.type_mismatch(self.argument, &*output))
    }

    /// Builds a pending invocation of this command
    pub(crate) fn invocation(
        &self,
        argument: Option<&dyn Argument>,
        completion: Option<Signal>,
    ) -> Result<Invocation, IpcError> {
        let call = match (&self.body, argument) {
            (Body::Void(body), None) => Call::Void(Arc::clone(body)),
            (Body::Write(body), Some(argument)) => {
                self.check_argument(self.argument, argument)?;
                Call::Write(Arc::clone(body), argument.clone_boxed())
            }
            (Body::Void(_), Some(_)) | (Body::Write(_), None) => {
                return Err(self.signature_mismatch(argument));
            }
            (Body::Read(_), _) | (Body::QualifiedRead(_), _) => {
                return Err(IpcError::NotQueueable {
                    command: self.name.clone(),
                    signature: self.signature(),
                });
            }
        };
        Ok(Invocation {
            command: self.name.clone(),
            expected: self.argument,
            call,
            completion,
        })
    }

    fn dispatch(
        &self,
        argument: Option<&dyn Argument>,
        completion: Option<Signal>,
    ) -> Result<ExecutionResult, IpcError> {
        if self.kind.is_queued() {
            let mailbox = self.mailbox.as_ref().ok_or_else(|| IpcError::NoMailbox {
                command: self.name.clone(),
            })?;
            mailbox.push(self.invocation(argument, completion)?)?;
            return Ok(ExecutionResult::Queued);
        }
        match (&self.body, argument) {
            (Body::Void(body), None) => body(),
            (Body::Write(body), Some(argument)) => {
                self.check_argument(self.argument, argument)?;
                if !body(argument) {
                    return Err(self.type_mismatch(self.argument, argument));
                }
            }
            _ => return Err(self.signature_mismatch(argument)),
        }
        if let Some(completion) = completion {
            completion.raise();
        }
        Ok(ExecutionResult::Executed)
    }

    fn dispatch_blocking(
        &self,
        argument: Option<&dyn Argument>,
        timeout: Duration,
    ) -> Result<(), IpcError> {
        let done = Signal::new();
        match self.dispatch(argument, Some(done.clone()))? {
            ExecutionResult::Executed => Ok(()),
            ExecutionResult::Queued => done.wait(timeout).map_err(|_| IpcError::Timeout {
                command: self.name.clone(),
            }),
        }
    }

    fn expect_signature(&self, attempted: SignatureClass) -> Result<(), IpcError> {
        if self.signature() == attempted {
            Ok(())
        } else {
            Err(IpcError::SignatureMismatch {
                command: self.name.clone(),
                actual: self.signature(),
                attempted,
            })
        }
    }

    fn signature_mismatch(&self, argument: Option<&dyn Argument>) -> IpcError {
        IpcError::SignatureMismatch {
            command: self.name.clone(),
            actual: self.signature(),
            attempted: if argument.is_some() {
                SignatureClass::Write
            } else {
                SignatureClass::Void
            },
        }
    }

    fn check_argument(
        &self,
        expected: Option<ArgumentPrototype>,
        actual: &dyn Argument,
    ) -> Result<(), IpcError> {
        match expected {
            Some(prototype) if prototype.matches(actual) => Ok(()),
            _ => Err(self.type_mismatch(expected, actual)),
        }
    }

    fn type_mismatch(&self, expected: Option<ArgumentPrototype>, actual: &dyn Argument) -> IpcError {
        IpcError::TypeMismatch {
            command: self.name.clone(),
            expected: expected.map(|prototype| prototype.type_name()).unwrap_or("()"),
            actual: actual.type_name(),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("argument", &self.argument)
            .field("qualifier", &self.qualifier)
            .field("mailbox", &self.mailbox_id())
            .finish()
    }
}

enum Call {
    Void(VoidBody),
    Write(WriteBody, Box<dyn Argument>),
}

/// One pending (command, argument) pair held by a mailbox
pub struct Invocation {
    command: String,
    expected: Option<ArgumentPrototype>,
    call: Call,
    completion: Option<Signal>,
}

impl Invocation {
    /// Name of the command to run
    pub fn command_name(&self) -> &str {
        &self.command
    }

    /// Runs the command body, then raises the completion signal if any
    pub(crate) fn execute(self) -> Result<(), IpcError> {
        let result = match &self.call {
            Call::Void(body) => {
                body();
                Ok(())
            }
            Call::Write(body, argument) => {
                if body(argument.as_ref()) {
                    Ok(())
                } else {
                    Err(IpcError::TypeMismatch {
                        command: self.command.clone(),
                        expected: self
                            .expected
                            .map(|prototype| prototype.type_name())
                            .unwrap_or("()"),
                        actual: argument.type_name(),
                    })
                }
            }
        };
        if let Some(completion) = &self.completion {
            completion.raise();
        }
        result
    }
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command", &self.command)
            .field("blocking", &self.completion.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::ErrorKind;
    use parking_lot::Mutex;
    use std::thread;

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, Command) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let command = Command::write("Record", move |value: &i32| sink.lock().push(*value));
        (seen, command)
    }

    #[test]
    fn test_kinds_resolved_at_registration() {
        let void = Command::void("Reset", || {});
        assert_eq!(void.kind(), CommandKind::DirectVoid);
        assert_eq!(void.into_queued().unwrap().kind(), CommandKind::QueuedVoid);

        let (_, write) = recorder();
        assert_eq!(write.into_queued().unwrap().kind(), CommandKind::QueuedWrite);
    }

    #[test]
    fn test_read_commands_are_never_queued() {
        let read = Command::read("GetValue", |out: &mut i32| *out = 7);
        let err = read.into_queued().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);

        let qualified = Command::qualified_read("Scale", |q: &i32, out: &mut i32| *out = *q * 2);
        assert!(qualified.into_queued().is_err());
    }

    #[test]
    fn test_direct_write_executes_immediately() {
        let (seen, command) = recorder();
        assert_eq!(
            command.execute_write(&3i32).unwrap(),
            ExecutionResult::Executed
        );
        assert_eq!(*seen.lock(), vec![3]);
    }

    #[test]
    fn test_write_type_mismatch_is_reported() {
        let (seen, command) = recorder();
        let err = command.execute_write(&3.0f64).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TypeMismatch);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_signature_mismatch_is_reported() {
        let (_, command) = recorder();
        let err = command.execute_void().unwrap_err();
        assert!(matches!(err, IpcError::SignatureMismatch { .. }));

        let read = Command::read("GetValue", |out: &mut i32| *out = 7);
        assert!(read.execute_write(&1i32).is_err());
    }

    #[test]
    fn test_read_and_qualified_read() {
        let read = Command::read("GetValue", |out: &mut i32| *out = 7);
        let mut value = 0i32;
        read.execute_read(&mut value).unwrap();
        assert_eq!(value, 7);

        let mut wrong = String::new();
        assert_eq!(
            read.execute_read(&mut wrong).unwrap_err().kind(),
            ErrorKind::TypeMismatch
        );

        let scale = Command::qualified_read("Scale", |q: &i32, out: &mut i64| {
            *out = i64::from(*q) * 10
        });
        let mut scaled = 0i64;
        scale.execute_qualified_read(&4i32, &mut scaled).unwrap();
        assert_eq!(scaled, 40);
        assert!(scale.execute_qualified_read(&4i64, &mut scaled).is_err());
    }

    #[test]
    fn test_queued_without_mailbox_is_policy_violation() {
        let command = Command::void("Start", || {}).into_queued().unwrap();
        let err = command.execute_void().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PolicyViolation);
    }

    #[test]
    fn test_queued_write_goes_through_mailbox() {
        let mailbox = Arc::new(Mailbox::new("Server", 4));
        let (seen, command) = recorder();
        let command = command.into_queued().unwrap().with_mailbox(Arc::clone(&mailbox));

        assert_eq!(
            command.execute_write(&9i32).unwrap(),
            ExecutionResult::Queued
        );
        assert!(seen.lock().is_empty());
        assert!(mailbox.execute_next());
        assert_eq!(*seen.lock(), vec![9]);
    }

    #[test]
    fn test_queued_write_rejects_wrong_type_before_queueing() {
        let mailbox = Arc::new(Mailbox::new("Server", 4));
        let (_, command) = recorder();
        let command = command.into_queued().unwrap().with_mailbox(Arc::clone(&mailbox));

        assert!(command.execute_write(&"text".to_string()).is_err());
        assert!(mailbox.is_empty());
    }

    #[test]
    fn test_clone_for_mailbox_rebinds_only_queued_kinds() {
        let first = Arc::new(Mailbox::new("first", 4));
        let second = Arc::new(Mailbox::new("second", 4));

        let queued = Arc::new(
            Command::void("Start", || {})
                .into_queued()
                .unwrap()
                .with_mailbox(Arc::clone(&first)),
        );
        let rebound = queued.clone_for_mailbox(&second);
        assert!(!Arc::ptr_eq(&queued, &rebound));
        assert_eq!(rebound.mailbox_id(), Some(second.id()));
        assert_eq!(queued.mailbox_id(), Some(first.id()));

        let read = Arc::new(Command::read("Get", |out: &mut i32| *out = 1));
        assert!(Arc::ptr_eq(&read, &read.clone_for_mailbox(&second)));
    }

    #[test]
    fn test_blocking_call_waits_for_execution() {
        let mailbox = Arc::new(Mailbox::new("Server", 4));
        let (seen, command) = recorder();
        let command = command.into_queued().unwrap().with_mailbox(Arc::clone(&mailbox));

        let consumer = Arc::clone(&mailbox);
        let handle = thread::spawn(move || {
            while !consumer.execute_next() {
                thread::sleep(Duration::from_millis(1));
            }
        });
        command
            .execute_write_blocking(&5i32, Duration::from_secs(5))
            .unwrap();
        assert_eq!(*seen.lock(), vec![5]);
        handle.join().unwrap();
    }

    #[test]
    fn test_blocking_call_times_out_when_not_drained() {
        let mailbox = Arc::new(Mailbox::new("Server", 4));
        let command = Command::void("Start", || {})
            .into_queued()
            .unwrap()
            .with_mailbox(Arc::clone(&mailbox));

        let err = command
            .execute_void_blocking(Duration::from_millis(10))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert_eq!(mailbox.len(), 1);
    }

    #[test]
    fn test_description() {
        let (_, command) = recorder();
        assert_eq!(command.description(), "DirectWrite(i32)");
        assert_eq!(Command::void("Reset", || {}).description(), "DirectVoid()");
        let scale = Command::qualified_read("Scale", |q: &i32, out: &mut i64| {
            *out = i64::from(*q)
        });
        assert_eq!(scale.description(), "QualifiedRead(i32 -> i64)");
    }
}
