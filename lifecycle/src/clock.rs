//! Clock abstraction
//!
//! The global component manager stamps pending connections with an expiry
//! time. Taking time from a trait object keeps the timeout sweep testable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A point in time, in nanoseconds since the clock's epoch
///
/// Instants from different clocks are not comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Instant {
    nanos: u64,
}

impl Instant {
    /// Creates an instant from nanoseconds
    pub const fn from_nanos(nanos: u64) -> Self {
        Self { nanos }
    }

    /// Returns nanoseconds since epoch
    pub fn as_nanos(&self) -> u64 {
        self.nanos
    }

    /// Returns the duration since another instant (zero if `earlier` is later)
    pub fn duration_since(&self, earlier: Instant) -> Duration {
        Duration::from_nanos(self.nanos.saturating_sub(earlier.nanos))
    }
}

impl Add<Duration> for Instant {
    type Output = Instant;

    fn add(self, duration: Duration) -> Self::Output {
        let delta = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Instant::from_nanos(self.nanos.saturating_add(delta))
    }
}

impl fmt::Display for Instant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.nanos)
    }
}

/// Source of monotonic time
pub trait Clock: Send + Sync + fmt::Debug {
    /// Returns the current instant
    fn now(&self) -> Instant;
}

/// Wall clock backed by `std::time::Instant`
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: std::time::Instant,
}

impl SystemClock {
    /// Creates a clock whose epoch is the moment of creation
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        let elapsed = self.origin.elapsed().as_nanos();
        Instant::from_nanos(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }
}

/// Manually advanced clock for deterministic tests
///
/// Time only moves when [`ManualClock::advance`] is called.
///
/// # Examples
///
/// ```
/// use lifecycle::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new();
/// assert_eq!(clock.now().as_nanos(), 0);
///
/// clock.advance(Duration::from_millis(5));
/// assert_eq!(clock.now().as_nanos(), 5_000_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    /// Creates a clock starting at zero
    pub fn new() -> Self {
        Self {
            nanos: AtomicU64::new(0),
        }
    }

    /// Creates a clock starting at a specific instant
    pub fn starting_at(instant: Instant) -> Self {
        Self {
            nanos: AtomicU64::new(instant.as_nanos()),
        }
    }

    /// Advances the clock
    pub fn advance(&self, delta: Duration) {
        let delta = u64::try_from(delta.as_nanos()).unwrap_or(u64::MAX);
        let _ = self
            .nanos
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some(current.saturating_add(delta))
            });
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        Instant::from_nanos(self.nanos.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_add_duration() {
        let start = Instant::from_nanos(1_000);
        let later = start + Duration::from_micros(1);
        assert_eq!(later.as_nanos(), 2_000);
        assert_eq!(later.duration_since(start), Duration::from_nanos(1_000));
    }

    #[test]
    fn test_duration_since_saturates() {
        let early = Instant::from_nanos(10);
        let late = Instant::from_nanos(20);
        assert_eq!(early.duration_since(late), Duration::ZERO);
    }

    #[test]
    fn test_manual_clock_advances_only_when_told() {
        let clock = ManualClock::starting_at(Instant::from_nanos(100));
        assert_eq!(clock.now(), Instant::from_nanos(100));
        assert_eq!(clock.now(), Instant::from_nanos(100));

        clock.advance(Duration::from_nanos(50));
        assert_eq!(clock.now(), Instant::from_nanos(150));
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let first = clock.now();
        let second = clock.now();
        assert!(second >= first);
    }
}
