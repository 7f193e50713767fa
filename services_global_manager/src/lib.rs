//! # Global Component Manager
//!
//! This crate tracks every process, component and interface of the system
//! and brokers connections between required and provided interfaces.
//!
//! ## Philosophy
//!
//! - **Bookkeeping, not wiring**: the manager records connections; the local
//!   manager of each process binds the actual interfaces
//! - **One lock**: every registry and connection change happens under a single
//!   connection-change lock; command execution never takes it
//! - **No partial state**: a failed connect leaves the manager untouched
//!
//! ## Connection protocol
//!
//! `connect` records a pending connection. `connect_confirm` establishes it;
//! a pending connection whose deadline passes is removed by
//! `check_connect_timeout`, usually driven by a [`TimeoutSweeper`].
//! Established connections leave only through `disconnect` or a cascading
//! removal.

pub mod config;
pub mod connection;
pub mod error;
pub mod manager;
pub mod peer;
pub mod sweeper;

pub use config::{GlobalManagerConfig, DEFAULT_NETWORK_CONNECT_TIMEOUT};
pub use connection::{ConnectionElement, ConnectionInfo, ConnectionStatus};
pub use error::GlobalManagerError;
pub use manager::GlobalManager;
pub use peer::{LocalManagerPeer, PeerError};
pub use sweeper::TimeoutSweeper;
