//! Two-component demo
//!
//! `Monitor` drives a `Counter` through a queued write command and follows
//! it through a `Changed` event, each component on its own thread.

use crate::{Runtime, RuntimeError};
use components::{Component, ComponentBehavior, ComponentTask, TaskMode};
use lifecycle::ComponentState;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL: Duration = Duration::from_millis(10);

/// Outcome of [`run_demo`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoReport {
    pub cycles: usize,
    pub final_value: i64,
    pub events_seen: usize,
}

impl fmt::Display for DemoReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} cycles, counter = {}, {} change events",
            self.cycles, self.final_value, self.events_seen
        )
    }
}

/// Behavior of components that only serve their mailboxes
struct MailboxOnly;

impl ComponentBehavior for MailboxOnly {
    fn run(&mut self, _component: &Component) {}
}

pub fn run_demo(runtime: &Runtime, cycles: usize) -> Result<DemoReport, RuntimeError> {
    let timeout = runtime.blocking_call_timeout();
    let value = Arc::new(Mutex::new(0i64));

    let counter = runtime.component("Counter");
    let provided = counter.add_interface_provided("Counter")?;
    let changed = provided.add_event_write::<i64>("Changed")?;
    {
        let value = Arc::clone(&value);
        provided.add_command_write("Add", move |delta: &i64| {
            let current = {
                let mut value = value.lock();
                *value += *delta;
                *value
            };
            if let Err(err) = changed.generate_write(&current) {
                warn!(error = %err, "change event not delivered");
            }
        })?;
    }
    {
        let value = Arc::clone(&value);
        provided.add_command_void("Reset", move || *value.lock() = 0)?;
    }
    {
        let value = Arc::clone(&value);
        provided.add_command_read("Value", move |out: &mut i64| *out = *value.lock())?;
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let monitor = runtime.component("Monitor");
    let required = monitor.add_interface_required("Counter")?;
    let add = required.add_function_write::<i64>("Add")?;
    let reset = required.add_function_void("Reset")?;
    let read = required.add_function_read::<i64>("Value")?;
    {
        let seen = Arc::clone(&seen);
        required.add_event_handler_write("Changed", move |current: &i64| seen.lock().push(*current))?;
    }

    let local = runtime.local();
    let server_task = Arc::new(ComponentTask::new(counter, TaskMode::Triggered { poll: POLL }));
    let client_task = Arc::new(ComponentTask::new(monitor, TaskMode::Triggered { poll: POLL }));
    local.add_task(Arc::clone(&server_task))?;
    local.add_task(Arc::clone(&client_task))?;
    local.connect("Monitor", "Counter", "Counter", "Counter")?;

    server_task.create(MailboxOnly)?;
    client_task.create(MailboxOnly)?;
    local.wait_for_state_all(ComponentState::Ready, timeout)?;
    local.start_all()?;

    reset.call_blocking(timeout)?;
    for cycle in 1..=cycles {
        add.call_blocking(&1, timeout)?;
        debug!(cycle, "increment executed");
    }
    let final_value = read.get()?;

    let started = Instant::now();
    while seen.lock().len() < cycles && started.elapsed() < timeout {
        thread::sleep(Duration::from_millis(1));
    }
    let events_seen = seen.lock().len();

    local.disconnect("Monitor", "Counter", "Counter", "Counter")?;
    local.kill_all(timeout)?;
    local.remove_component("Monitor")?;
    local.remove_component("Counter")?;

    let report = DemoReport {
        cycles,
        final_value,
        events_seen,
    };
    info!(%report, "demo finished");
    Ok(report)
}
