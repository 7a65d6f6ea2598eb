//! Hardware abstraction for the clock, wake alarm and power control
//!
//! The protocol core only reads the clock. Arming the alarm and suspending
//! are left to the runtime driver so the core stays free of irreversible
//! side effects.

mod clock;

pub use self::clock::{ManualClock, SystemClock};

use std::time::Duration;
use tracing::info;

use crate::core::{Result, Ticks};

/// Monotonic time source with a wake alarm
pub trait Clock {
    /// Seconds since the clock was started
    fn now(&self) -> Ticks;

    /// Arms the wake alarm `after` from now
    fn set_alarm(&mut self, after: Duration) -> Result<()>;
}

/// Power management primitive
pub trait Power {
    /// Suspends execution until the armed alarm fires
    ///
    /// On hardware this does not return: the device resumes through reset.
    fn standby(&mut self) -> Result<()>;
}

/// Power control for hosts where suspension is simulated
///
/// Records each standby request and returns immediately; the caller is
/// expected to wait out the alarm itself.
#[derive(Debug, Default)]
pub struct HostPower {
    standby_count: u32,
}

impl HostPower {
    /// Creates a new host power controller
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of standby requests seen so far
    pub fn standby_count(&self) -> u32 {
        self.standby_count
    }
}

impl Power for HostPower {
    fn standby(&mut self) -> Result<()> {
        self.standby_count += 1;
        info!(count = self.standby_count, "Entering simulated standby");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_power_counts_standby() {
        let mut power = HostPower::new();
        power.standby().unwrap();
        power.standby().unwrap();
        assert_eq!(power.standby_count(), 2);
    }
}
