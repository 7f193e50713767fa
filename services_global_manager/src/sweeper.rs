//! Periodic connect-timeout sweep

use crate::{GlobalManager, GlobalManagerError};
use lifecycle::Signal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

/// Background thread calling [`GlobalManager::check_connect_timeout`]
///
/// The thread holds only a weak handle and exits once the manager is gone.
/// Dropping the sweeper stops it.
pub struct TimeoutSweeper {
    stop: Arc<AtomicBool>,
    wake: Signal,
    handle: Option<JoinHandle<()>>,
}

impl TimeoutSweeper {
    pub fn spawn(manager: &Arc<GlobalManager>, period: Duration) -> Result<Self, GlobalManagerError> {
        let stop = Arc::new(AtomicBool::new(false));
        let wake = Signal::new();
        let weak = Arc::downgrade(manager);
        let handle = {
            let stop = Arc::clone(&stop);
            let wake = wake.clone();
            thread::Builder::new()
                .name("gcm-timeout-sweep".to_string())
                .spawn(move || sweep_loop(weak, period, stop, wake))
                .map_err(GlobalManagerError::Spawn)?
        };
        debug!(?period, "timeout sweeper started");
        Ok(Self {
            stop,
            wake,
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Stops the thread and waits for it
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        self.wake.raise();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("timeout sweeper panicked");
            }
        }
    }
}

impl Drop for TimeoutSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sweep_loop(manager: Weak<GlobalManager>, period: Duration, stop: Arc<AtomicBool>, wake: Signal) {
    while !stop.load(Ordering::Acquire) {
        let _ = wake.wait(period);
        if stop.load(Ordering::Acquire) {
            break;
        }
        let Some(manager) = manager.upgrade() else {
            break;
        };
        let expired = manager.check_connect_timeout();
        if !expired.is_empty() {
            debug!(count = expired.len(), "sweep removed pending connections");
        }
    }
    debug!("timeout sweeper stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GlobalManagerConfig;
    use core_types::InterfaceId;
    use lifecycle::ManualClock;
    use std::time::Instant;

    #[test]
    fn test_sweeper_removes_expired_connection() {
        let clock = Arc::new(ManualClock::new());
        let manager = Arc::new(GlobalManager::with_clock(
            GlobalManagerConfig::default(),
            clock.clone(),
        ));
        let client = InterfaceId::new("P2", "C2", "Client");
        let server = InterfaceId::new("P1", "C1", "Server");
        manager.add_process("P1").unwrap();
        manager.add_component("P1", "C1").unwrap();
        manager.add_interface_provided(&server, false).unwrap();
        manager.add_process("P2").unwrap();
        manager.add_component("P2", "C2").unwrap();
        manager.add_interface_required(&client, false).unwrap();
        manager.connect("P2", &client, &server).unwrap();

        let sweeper = TimeoutSweeper::spawn(&manager, Duration::from_millis(1)).unwrap();
        assert!(sweeper.is_running());
        clock.advance(Duration::from_secs(5));

        let started = Instant::now();
        while manager.connection_count() > 0 {
            assert!(started.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(1));
        }
        sweeper.stop();
    }

    #[test]
    fn test_sweeper_exits_when_manager_dropped() {
        let manager = Arc::new(GlobalManager::default());
        let sweeper = TimeoutSweeper::spawn(&manager, Duration::from_millis(1)).unwrap();
        drop(manager);

        let started = Instant::now();
        while sweeper.is_running() {
            assert!(started.elapsed() < Duration::from_secs(5));
            thread::sleep(Duration::from_millis(1));
        }
    }
}
