//! Component lifecycle states

use crate::LifecycleError;
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle states for a component
///
/// States are ordered: waiting for a state succeeds once the component has
/// reached that state or any later one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ComponentState {
    /// Object exists, nothing has run
    Constructed,
    /// `create` was called, startup in progress
    Initializing,
    /// Startup done, not running (also the state after `suspend`)
    Ready,
    /// Run loop is processing mailboxes
    Active,
    /// `kill` requested, cleanup in progress
    Finishing,
    /// Component has stopped for good
    Finished,
}

impl ComponentState {
    /// Checks if the component is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, ComponentState::Finished)
    }

    /// Checks if the component is running
    pub fn is_active(&self) -> bool {
        matches!(self, ComponentState::Active)
    }

    /// Returns true if `next` may follow `self`
    pub fn can_transition_to(&self, next: ComponentState) -> bool {
        use ComponentState::*;
        matches!(
            (self, next),
            (Constructed, Initializing)
                | (Initializing, Ready)
                | (Ready, Active)
                | (Active, Ready)
                | (Constructed, Finishing)
                | (Initializing, Finishing)
                | (Ready, Finishing)
                | (Active, Finishing)
                | (Finishing, Finished)
        )
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComponentState::Constructed => "constructed",
            ComponentState::Initializing => "initializing",
            ComponentState::Ready => "ready",
            ComponentState::Active => "active",
            ComponentState::Finishing => "finishing",
            ComponentState::Finished => "finished",
        };
        write!(f, "{}", label)
    }
}

/// Observable state cell with timeout-bounded waits
#[derive(Debug)]
pub struct StateMonitor {
    state: Mutex<ComponentState>,
    changed: Condvar,
}

impl StateMonitor {
    /// Creates a monitor in the `Constructed` state
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ComponentState::Constructed),
            changed: Condvar::new(),
        }
    }

    /// Returns the current state
    pub fn get(&self) -> ComponentState {
        *self.state.lock()
    }

    /// Moves to `next` if the lifecycle allows it; returns the previous state
    pub fn transition(&self, next: ComponentState) -> Result<ComponentState, LifecycleError> {
        let mut state = self.state.lock();
        let previous = *state;
        if !previous.can_transition_to(next) {
            return Err(LifecycleError::InvalidTransition {
                from: previous,
                to: next,
            });
        }
        *state = next;
        self.changed.notify_all();
        Ok(previous)
    }

    /// Waits until the state reaches `desired` (or a later state)
    pub fn wait_for(
        &self,
        desired: ComponentState,
        timeout: Duration,
    ) -> Result<ComponentState, LifecycleError> {
        let deadline = std::time::Instant::now() + timeout;
        let mut state = self.state.lock();
        while *state < desired {
            if self.changed.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        if *state >= desired {
            Ok(*state)
        } else {
            Err(LifecycleError::Timeout)
        }
    }
}

impl Default for StateMonitor {
    fn default() -> Self {
        Self::new()
    }
}
