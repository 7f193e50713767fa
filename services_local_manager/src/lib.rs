//! # Local Component Manager
//!
//! Per-process registry of components and executor of local connections.
//!
//! ## Philosophy
//!
//! - **Wiring is local**: binding a required interface to a provided one only
//!   ever happens in the process that owns both
//! - **Global first**: connections are requested from the global manager,
//!   which calls back here through [`services_global_manager::LocalManagerPeer`]
//! - **One clone per client**: every wired required interface gets its own
//!   end-user interface and mailbox
//!
//! ## Key Types
//!
//! - [`LocalManager`]: components, tasks, wiring and introspection
//! - [`LocalManagerConfig`]: mailbox sizing for components it builds

pub mod config;
pub mod error;
pub mod manager;

pub use config::{LocalManagerConfig, DEFAULT_MAILBOX_SIZE};
pub use error::LocalManagerError;
pub use manager::LocalManager;
