//! # Interfaces
//!
//! Provided and required interfaces: the named bundles through which
//! components offer and use commands and events.
//!
//! ## Philosophy
//!
//! - **One writer per mailbox**: every caller of a provided interface gets
//!   its own end-user clone with a private mailbox
//! - **Setup, then run**: command and event maps are filled before the
//!   first clone exists and are read-only afterwards
//! - **Fail closed**: duplicate names are rejected, nothing is overwritten
//!
//! ## Key Types
//!
//! - [`ProvidedInterface`]: factory or end-user bundle of commands and events
//! - [`RequiredInterface`]: function handles and event handlers
//! - [`FunctionVoid`], [`FunctionWrite`], [`FunctionRead`],
//!   [`FunctionQualifiedRead`]: typed handles bound on connect

pub mod error;
pub mod function;
pub mod provided;
pub mod required;

pub use error::InterfaceError;
pub use function::{FunctionQualifiedRead, FunctionRead, FunctionVoid, FunctionWrite};
pub use provided::{ProvidedInterface, QueuingPolicy};
pub use required::RequiredInterface;
