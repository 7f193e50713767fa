//! Bounded mailbox of pending invocations
//!
//! One mailbox exists per end-user provided interface (and per required
//! interface for queued event handlers). The caller's thread queues, the
//! owning component's thread executes. The lock only covers push and pop;
//! command bodies always run with it released.

use crate::{Argument, Command, Invocation, IpcError};
use core_types::MailboxId;
use lifecycle::Signal;
use parking_lot::{Mutex, RwLock};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Bounded FIFO of pending command invocations
#[derive(Debug)]
pub struct Mailbox {
    id: MailboxId,
    name: String,
    capacity: usize,
    pending: Mutex<VecDeque<Invocation>>,
    wake: RwLock<Option<Signal>>,
}

impl Mailbox {
    /// Creates an empty mailbox holding at most `capacity` invocations
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        Self {
            id: MailboxId::new(),
            name: name.into(),
            capacity,
            pending: Mutex::new(VecDeque::with_capacity(capacity)),
            wake: RwLock::new(None),
        }
    }

    pub fn id(&self) -> MailboxId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of pending invocations
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    /// Number of invocations that can still be queued
    pub fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    /// Signal raised every time an invocation is accepted
    ///
    /// Lets a triggered component sleep until there is work.
    pub fn set_wake_signal(&self, signal: Option<Signal>) {
        *self.wake.write() = signal;
    }

    /// Queues `command` with an optional argument
    ///
    /// Fails with `QueueOverflow` when full; the invocation is dropped and
    /// the caller must treat it as rejected.
    pub fn queue(&self, command: &Command, argument: Option<&dyn Argument>) -> Result<(), IpcError> {
        self.push(command.invocation(argument, None)?)
    }

    pub(crate) fn push(&self, invocation: Invocation) -> Result<(), IpcError> {
        {
            let mut pending = self.pending.lock();
            if pending.len() >= self.capacity {
                warn!(
                    mailbox = %self.name,
                    command = invocation.command_name(),
                    capacity = self.capacity,
                    "mailbox full, dropping invocation"
                );
                return Err(IpcError::QueueOverflow {
                    mailbox: self.id,
                    capacity: self.capacity,
                    command: invocation.command_name().to_string(),
                });
            }
            pending.push_back(invocation);
        }
        if let Some(signal) = self.wake.read().as_ref() {
            signal.raise();
        }
        Ok(())
    }

    /// Executes the oldest pending invocation
    ///
    /// Returns false without blocking when the mailbox is empty. A failing
    /// invocation is logged and still counts as executed.
    pub fn execute_next(&self) -> bool {
        let next = self.pending.lock().pop_front();
        match next {
            Some(invocation) => {
                let command = invocation.command_name().to_string();
                if let Err(err) = invocation.execute() {
                    warn!(mailbox = %self.name, %command, error = %err, "queued invocation failed");
                }
                true
            }
            None => false,
        }
    }

    /// Executes pending invocations until the mailbox is empty
    ///
    /// Returns the number executed.
    pub fn drain(&self) -> usize {
        let mut executed = 0;
        while self.execute_next() {
            executed += 1;
        }
        if executed > 0 {
            debug!(mailbox = %self.name, executed, "mailbox drained");
        }
        executed
    }
}
