//! # Core Types
//!
//! This crate defines the identity types shared by every layer of the
//! component runtime.
//!
//! ## Philosophy
//!
//! - **Names are identity**: a process, component or interface is identified
//!   by its name inside its parent scope, never by a pointer.
//! - **Triples, not strings**: an interface is addressed by an explicit
//!   `(process, component, interface)` triple.
//! - **One taxonomy**: every crate maps its errors onto [`ErrorKind`].
//!
//! ## Key Types
//!
//! - [`ConnectionId`]: monotonically increasing connection identifier
//! - [`MailboxId`]: unique identifier of one mailbox instance
//! - [`InterfaceId`]: globally unique interface triple
//! - [`ConnectionDescription`]: client triple + server triple
//! - [`ErrorKind`]: the recoverable error taxonomy

pub mod error_kind;
pub mod ids;
pub mod naming;

pub use error_kind::ErrorKind;
pub use ids::{ConnectionId, MailboxId};
pub use naming::{
    component_proxy_name, end_user_interface_name, is_proxy_component, ConnectionDescription,
    InterfaceId,
};
