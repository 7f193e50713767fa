//! # Components
//!
//! Components own interfaces and drain their mailboxes; tasks give a
//! component its own thread.
//!
//! ## Philosophy
//!
//! - **Own your mailboxes**: a component only ever drains its own queues
//! - **Cooperative cycles**: a dequeued command always runs to completion
//! - **States are exposed, not interpreted**: the lifecycle is observable
//!   through [`lifecycle::ComponentState`], callers decide what it means
//!
//! ## Key Types
//!
//! - [`Component`]: interface ownership and `process_mailboxes`
//! - [`ComponentTask`]: periodic or triggered thread driving a component
//! - [`ComponentBehavior`]: user code run on the task thread

pub mod component;
pub mod error;
pub mod task;

pub use component::Component;
pub use error::ComponentError;
pub use task::{ComponentBehavior, ComponentTask, TaskMode};
