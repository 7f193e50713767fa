//! # Lifecycle
//!
//! Time, timeout and state primitives for the component runtime.
//!
//! ## Philosophy
//!
//! - **Explicit over implicit**: every wait is bounded by an explicit timeout
//! - **Testability first**: time comes from a [`Clock`], so tests can use
//!   [`ManualClock`] and advance time deterministically
//! - **Mechanism not policy**: components and managers decide what to do
//!   when a deadline passes
//!
//! ## Core Concepts
//!
//! - `Clock`: source of [`Instant`]s (`SystemClock`, `ManualClock`)
//! - `Deadline`: point in time when an operation should time out
//! - `Timeout`: duration-based timeout converted to a deadline on use
//! - `Signal`: auto-reset signal with a timeout-bounded wait
//! - `ComponentState` / `StateMonitor`: observable component lifecycle

pub mod clock;
pub mod deadline;
pub mod signal;
pub mod state;

pub use clock::{Clock, Instant, ManualClock, SystemClock};
pub use deadline::{Deadline, Timeout};
pub use signal::Signal;
pub use state::{ComponentState, StateMonitor};

use thiserror::Error;

/// Errors related to lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// A bounded wait expired
    #[error("Operation timed out")]
    Timeout,

    /// A state change was requested that the lifecycle does not allow
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        from: ComponentState,
        to: ComponentState,
    },
}
