//! Component tasks
//!
//! A task gives a component its own thread. Each cycle drains the
//! component's mailboxes and then runs the user behavior. Command bodies run
//! to completion; there is no preemption inside a cycle.

use crate::{Component, ComponentError};
use lifecycle::{ComponentState, Signal};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

/// How a task thread paces its cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskMode {
    /// One cycle per period
    Periodic(Duration),
    /// One cycle whenever a mailbox receives work, at least every `poll`
    Triggered { poll: Duration },
}

/// User code run by a task thread
pub trait ComponentBehavior: Send + 'static {
    /// Called once on the task thread before the component becomes ready
    fn startup(&mut self, _component: &Component) {}

    /// Called every cycle while the component is active
    fn run(&mut self, component: &Component);

    /// Called once on the task thread after kill
    fn cleanup(&mut self, _component: &Component) {}
}

#[derive(Debug, Default)]
struct TaskControl {
    stop: AtomicBool,
    interrupt: Signal,
}

/// Thread driving one component
pub struct ComponentTask {
    component: Arc<Component>,
    mode: TaskMode,
    control: Arc<TaskControl>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ComponentTask {
    pub fn new(component: Arc<Component>, mode: TaskMode) -> Self {
        Self {
            component,
            mode,
            control: Arc::new(TaskControl::default()),
            handle: Mutex::new(None),
        }
    }

    pub fn component(&self) -> &Arc<Component> {
        &self.component
    }

    pub fn mode(&self) -> TaskMode {
        self.mode
    }

    /// Spawns the task thread, which runs startup and moves to `Ready`
    pub fn create<B: ComponentBehavior>(&self, behavior: B) -> Result<(), ComponentError> {
        let mut handle = self.handle.lock();
        if handle.is_some() {
            return Err(ComponentError::AlreadyCreated(
                self.component.name().to_string(),
            ));
        }
        self.component.transition(ComponentState::Initializing)?;

        let component = Arc::clone(&self.component);
        let control = Arc::clone(&self.control);
        let mode = self.mode;
        let spawned = thread::Builder::new()
            .name(format!(
                "{}.{}",
                self.component.process_name(),
                self.component.name()
            ))
            .spawn(move || run_loop(component, mode, control, behavior))
            .map_err(|source| ComponentError::Spawn {
                component: self.component.name().to_string(),
                source,
            })?;
        *handle = Some(spawned);
        Ok(())
    }

    /// Makes the run loop execute cycles
    pub fn start(&self) -> Result<(), ComponentError> {
        self.component.start()?;
        self.control.interrupt.raise();
        Ok(())
    }

    /// Keeps the thread alive but stops running cycles
    pub fn suspend(&self) -> Result<(), ComponentError> {
        self.component.suspend()
    }

    /// Stops the thread and waits, bounded by `timeout`, for cleanup
    pub fn kill(&self, timeout: Duration) -> Result<(), ComponentError> {
        if self.component.state().is_terminal() {
            return Ok(());
        }
        // Finishing must be set before the thread can observe the stop flag.
        if self.component.state() != ComponentState::Finishing {
            self.component.transition(ComponentState::Finishing)?;
        }
        self.control.stop.store(true, Ordering::Release);
        self.control.interrupt.raise();
        self.component.wake_signal().raise();

        // Never created: nothing to clean up on another thread.
        if self.handle.lock().is_none() {
            return self.component.transition(ComponentState::Finished);
        }
        // The handle stays put on timeout so a later kill waits again.
        self.component
            .wait_for_state(ComponentState::Finished, timeout)?;
        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => handle
                .join()
                .map_err(|_| ComponentError::Panicked(self.component.name().to_string())),
            None => Ok(()),
        }
    }

    pub fn wait_for_state(
        &self,
        state: ComponentState,
        timeout: Duration,
    ) -> Result<ComponentState, ComponentError> {
        self.component.wait_for_state(state, timeout)
    }
}

impl Drop for ComponentTask {
    fn drop(&mut self) {
        if self.handle.lock().is_some() {
            self.control.stop.store(true, Ordering::Release);
            self.control.interrupt.raise();
            self.component.wake_signal().raise();
        }
    }
}

fn run_loop<B: ComponentBehavior>(
    component: Arc<Component>,
    mode: TaskMode,
    control: Arc<TaskControl>,
    mut behavior: B,
) {
    let span = component.span().clone();
    let _entered = span.enter();

    behavior.startup(&component);
    if let Err(err) = component.transition(ComponentState::Ready) {
        debug!(error = %err, "startup finished after kill was requested");
    }
    info!(?mode, "task running");

    while !control.stop.load(Ordering::Acquire) {
        if component.state().is_active() {
            component.process_mailboxes();
            behavior.run(&component);
        }
        let _ = match mode {
            TaskMode::Periodic(period) => control.interrupt.wait(period),
            TaskMode::Triggered { poll } => component.wake_signal().wait(poll),
        };
    }

    behavior.cleanup(&component);
    if component.state() != ComponentState::Finishing {
        if let Err(err) = component.transition(ComponentState::Finishing) {
            warn!(error = %err, "unexpected state at shutdown");
        }
    }
    if let Err(err) = component.transition(ComponentState::Finished) {
        warn!(error = %err, "could not mark component finished");
    }
    info!("task finished");
}
