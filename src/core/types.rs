use std::fmt;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use super::{Error, Result};

/// Network address of a radio device
///
/// Address `0` is reserved: it marks an empty registry slot and is never
/// assigned to a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Address(pub u8);

impl Address {
    /// The reserved "no device" address
    pub const UNASSIGNED: Address = Address(0);

    /// Returns whether this is a usable device address
    pub fn is_assigned(&self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic clock reading in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Ticks(pub u64);

impl Ticks {
    /// Seconds elapsed since `earlier`, zero if the clock is behind it
    pub fn since(&self, earlier: Ticks) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Protocol command codes
///
/// Code `0` is never a legal command: command tables use it as their
/// terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Command {
    /// Presence announcement and its verdict
    Broadcast = 1,
    /// Sensor payload
    Data = 2,
    /// Standby request and its acknowledgment
    Sleep = 3,
}

impl Command {
    /// Returns the wire code for this command
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Maps a wire code back to a command
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Command::Broadcast),
            2 => Some(Command::Data),
            3 => Some(Command::Sleep),
            _ => None,
        }
    }
}

/// Configuration for the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Number of device slots in the registry
    pub registry_capacity: usize,
    /// Silence after which a device is told to sleep, in whole seconds
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub device_timeout: Duration,
    /// Housekeeping cadence
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub poll_interval: Duration,
    /// Free a timed-out slot once its sleep notice has been sent
    pub release_stale: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        CoordinatorConfig {
            registry_capacity: super::DEFAULT_REGISTRY_CAPACITY,
            device_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_secs(1),
            release_stale: false,
        }
    }
}

impl CoordinatorConfig {
    /// Checks the configuration for values the coordinator cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.registry_capacity == 0 {
            return Err(Error::config("Registry capacity must be at least one slot"));
        }
        if self.device_timeout.as_secs() == 0 {
            return Err(Error::config("Device timeout must be at least one second"));
        }
        // Device ages are counted in whole clock ticks
        if self.device_timeout.subsec_nanos() != 0 {
            return Err(Error::config("Device timeout must be a whole number of seconds"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::config("Poll interval must be non-zero"));
        }
        Ok(())
    }
}

/// Configuration for a sensor node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// This node's own network address
    pub address: Address,
    /// Unacknowledged broadcasts before giving up and entering standby
    pub retry_limit: u8,
    /// Alarm delay armed before entering standby
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub standby_interval: Duration,
    /// Self-announcement cadence
    #[serde(serialize_with = "super::serde::serialize_duration")]
    #[serde(deserialize_with = "super::serde::deserialize_duration")]
    pub poll_interval: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        NodeConfig {
            address: Address(1),
            retry_limit: super::DEFAULT_RETRY_LIMIT,
            standby_interval: Duration::from_secs(super::DEFAULT_STANDBY_SECS),
            poll_interval: Duration::from_secs(1),
        }
    }
}

impl NodeConfig {
    /// Checks the configuration for values the node cannot run with
    pub fn validate(&self) -> Result<()> {
        if !self.address.is_assigned() {
            return Err(Error::config("Node address 0 is reserved"));
        }
        if self.retry_limit == 0 {
            return Err(Error::config("Retry limit must be at least one"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::config("Poll interval must be non-zero"));
        }
        Ok(())
    }
}
