//! radiopoll: command dispatch and device lifecycle for a polled radio network
//!
//! One coordinator ("master") polls a population of battery-powered sensor
//! nodes ("slaves") over a half-duplex radio. This library provides the
//! role-specific command tables and handlers, the coordinator's device
//! registry with its timeout sweep, and the node's announce/retry/standby
//! state machine, together with host-side transports and run loops.
pub mod core;
pub mod hal;
pub mod master;
pub mod measure;
pub mod protocol;
pub mod runtime;
pub mod slave;
pub mod transport;
pub mod util;

#[cfg(test)]
mod testing;

// Re-export commonly used items
pub use crate::core::{Error, Result};
pub use master::{Coordinator, MASTER_COMMANDS};
pub use slave::{Node, SLAVE_COMMANDS};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
