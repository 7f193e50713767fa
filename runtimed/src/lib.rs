//! # Component Runtime Host
//!
//! This crate provides the runtime context of one process and the host
//! binary around it.
//!
//! ## Philosophy
//!
//! - **Explicit context**: the global and local managers are reached through
//!   a [`Runtime`] value, never through process-wide singletons
//! - **Configuration, not constants**: timeouts and mailbox sizes come from
//!   [`RuntimeConfig`]
//! - **Host owns I/O**: components log through `tracing`; only the binary
//!   prints
//!
//! ## Responsibilities
//!
//! The host runtime:
//! - Registers the process with the global manager
//! - Runs the connect-timeout sweep
//! - Installs log output
//! - Runs the two-component demo

pub mod config;
pub mod demo;
pub mod logging;
pub mod runtime;

pub use config::RuntimeConfig;
pub use demo::{run_demo, DemoReport};
pub use logging::init_logging;
pub use runtime::{Runtime, RuntimeError};
