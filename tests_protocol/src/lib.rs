//! Protocol Test Utilities
//!
//! This crate provides shared setup for the cross-crate protocol tests.
//!
//! ## Test Philosophy
//!
//! - **Deterministic time**: connection timeouts are driven by a manual clock
//! - **No partial state**: every rejected request is checked against the
//!   state before it
//! - **Real threads where it matters**: mailbox tests use component tasks, not
//!   simulated schedulers

use core_types::InterfaceId;
use lifecycle::ManualClock;
use parking_lot::Mutex;
use services_global_manager::{GlobalManager, GlobalManagerConfig};
use std::sync::Arc;

/// Global manager timed by a manual clock starting at zero
pub fn manual_global_manager() -> (Arc<GlobalManager>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let manager = Arc::new(GlobalManager::with_clock(
        GlobalManagerConfig::default(),
        clock.clone(),
    ));
    (manager, clock)
}

/// Registers `P1:C1:Server` (provided) and `P2:C2:Client` (required)
///
/// Returns the client and server triples.
pub fn register_two_processes(global: &GlobalManager) -> (InterfaceId, InterfaceId) {
    let server = InterfaceId::new("P1", "C1", "Server");
    let client = InterfaceId::new("P2", "C2", "Client");
    global.add_process("P1").expect("add P1");
    global.add_component("P1", "C1").expect("add C1");
    global
        .add_interface_provided(&server, false)
        .expect("add provided interface");
    global.add_process("P2").expect("add P2");
    global.add_component("P2", "C2").expect("add C2");
    global
        .add_interface_required(&client, false)
        .expect("add required interface");
    (client, server)
}

/// Shared, ordered record of what command bodies saw
#[derive(Debug, Clone, Default)]
pub struct Trace {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().push(entry.into());
    }

    /// Closure recording `entry` each time it runs
    pub fn recorder(&self, entry: &str) -> impl Fn() + Send + Sync + 'static {
        let trace = self.clone();
        let entry = entry.to_string();
        move || trace.push(entry.clone())
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
