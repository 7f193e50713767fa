//! # Inter-Process Communication (IPC)
//!
//! This crate defines the command, event and mailbox primitives that let one
//! component's thread invoke code owned by another component's thread.
//!
//! ## Philosophy
//!
//! - **Explicit dispatch**: a command is direct or queued from the moment it
//!   is registered; there is no guessing at call time
//! - **Typed, not stringly-typed**: arguments are checked against a
//!   prototype before they are executed or queued
//! - **Bounded**: mailboxes never grow; a full mailbox rejects the call
//! - **Best effort fan-out**: events reach every observer that can take them
//!
//! ## Architecture
//!
//! - [`Command`]: named callable with a [`SignatureClass`] and [`CommandKind`]
//! - [`EventGenerator`]: list of observer commands invoked in order
//! - [`Mailbox`]: bounded FIFO of [`Invocation`]s drained by the owner
//! - [`TypeRegistry`]: name to factory map for argument reconstruction

pub mod argument;
pub mod command;
pub mod error;
pub mod event;
pub mod mailbox;
pub mod type_registry;

pub use argument::{Argument, ArgumentPrototype};
pub use command::{Command, CommandKind, ExecutionResult, Invocation, SignatureClass};
pub use error::IpcError;
pub use event::{EventGenerator, FanOutReport, ObserverFailure};
pub use mailbox::Mailbox;
pub use type_registry::TypeRegistry;
