use std::cell::Cell;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::{Error, Result, Ticks};
use super::Clock;

/// Clock backed by the host's monotonic timer
///
/// Ticks count whole seconds since construction. The alarm is kept as a
/// wall-clock instant for logging only.
#[derive(Debug)]
pub struct SystemClock {
    started: Instant,
    alarm: Option<DateTime<Utc>>,
}

impl SystemClock {
    /// Starts a clock at zero ticks
    pub fn new() -> Self {
        SystemClock {
            started: Instant::now(),
            alarm: None,
        }
    }

    /// Wall-clock time the alarm was last armed for
    pub fn alarm(&self) -> Option<DateTime<Utc>> {
        self.alarm
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Ticks {
        Ticks(self.started.elapsed().as_secs())
    }

    fn set_alarm(&mut self, after: Duration) -> Result<()> {
        let after = chrono::Duration::from_std(after)
            .map_err(|e| Error::config(format!("Alarm delay out of range: {}", e)))?;
        let at = Utc::now() + after;
        debug!(alarm = %at.to_rfc3339(), "Wake alarm armed");
        self.alarm = Some(at);
        Ok(())
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
    alarm: Option<Duration>,
}

impl ManualClock {
    /// Creates a clock reading `start` seconds
    pub fn new(start: u64) -> Self {
        ManualClock {
            now: Cell::new(start),
            alarm: None,
        }
    }

    /// Moves the clock forward
    pub fn advance(&self, secs: u64) {
        self.now.set(self.now.get().saturating_add(secs));
    }

    /// Sets the clock to an absolute reading
    pub fn set(&self, secs: u64) {
        self.now.set(secs);
    }

    /// Last armed alarm delay
    pub fn alarm(&self) -> Option<Duration> {
        self.alarm
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Ticks {
        Ticks(self.now.get())
    }

    fn set_alarm(&mut self, after: Duration) -> Result<()> {
        self.alarm = Some(after);
        Ok(())
    }
}
