//! Core types and traits for the radio command layer
//!
//! This module contains the fundamental building blocks used throughout the library.

pub mod error;
pub mod types;
pub mod serde;

pub use self::error::{Error, Result};
pub use self::types::{
    Address,
    Command,
    CoordinatorConfig,
    NodeConfig,
    Ticks,
};

/// Positive acknowledgment payload byte
pub const ACK: u8 = 0x06;

/// Negative acknowledgment payload byte
pub const NACK: u8 = 0x15;

/// Largest payload carried by one envelope (transceiver FIFO minus header)
pub const MAX_PAYLOAD: usize = 60;

/// Default number of device slots on the coordinator
pub const DEFAULT_REGISTRY_CAPACITY: usize = 5;

/// Default number of unacknowledged broadcasts before standby
pub const DEFAULT_RETRY_LIMIT: u8 = 3;

/// Default wake alarm delay in seconds
pub const DEFAULT_STANDBY_SECS: u64 = 30;
