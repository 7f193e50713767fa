//! Auto-reset signal with bounded waits
//!
//! Used in two places: a component's run loop sleeps on one until a mailbox
//! receives work, and a blocking caller waits on one until its queued
//! invocation has executed. Waiting without a timeout is not offered.

use crate::LifecycleError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct SignalInner {
    raised: Mutex<bool>,
    condvar: Condvar,
}

/// Cloneable handle to a shared auto-reset signal
///
/// `raise` wakes one pending or future `wait`; a successful `wait` resets the
/// signal.
#[derive(Debug, Clone, Default)]
pub struct Signal {
    inner: Arc<SignalInner>,
}

impl Signal {
    /// Creates a lowered signal
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal and wakes waiters
    pub fn raise(&self) {
        let mut raised = self.inner.raised.lock();
        *raised = true;
        self.inner.condvar.notify_all();
    }

    /// Returns true if the signal is raised and not yet consumed
    pub fn is_raised(&self) -> bool {
        *self.inner.raised.lock()
    }

    /// Waits until the signal is raised or the timeout expires
    pub fn wait(&self, timeout: Duration) -> Result<(), LifecycleError> {
        let deadline = std::time::Instant::now() + timeout;
        let mut raised = self.inner.raised.lock();
        while !*raised {
            if self
                .inner
                .condvar
                .wait_until(&mut raised, deadline)
                .timed_out()
            {
                break;
            }
        }
        if *raised {
            *raised = false;
            Ok(())
        } else {
            Err(LifecycleError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_wait_times_out_when_never_raised() {
        let signal = Signal::new();
        let result = signal.wait(Duration::from_millis(10));
        assert_eq!(result, Err(LifecycleError::Timeout));
    }

    #[test]
    fn test_raise_before_wait_is_not_lost() {
        let signal = Signal::new();
        signal.raise();
        assert!(signal.is_raised());
        assert!(signal.wait(Duration::from_millis(10)).is_ok());
        assert!(!signal.is_raised());
    }

    #[test]
    fn test_raise_from_other_thread() {
        let signal = Signal::new();
        let remote = signal.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(5));
            remote.raise();
        });
        assert!(signal.wait(Duration::from_secs(5)).is_ok());
        handle.join().unwrap();
    }
}
