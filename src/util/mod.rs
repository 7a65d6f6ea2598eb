//! Utility module
//!
//! This module provides common utilities and helper functions used
//! throughout the library.

use tracing_subscriber::EnvFilter;

use crate::core::{Error, Result};

/// Installs a formatted tracing subscriber for the process
///
/// `RUST_LOG` takes precedence over `default_filter` when set. Fails if a
/// global subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .map_err(|e| Error::config(format!("Invalid log filter: {}", e)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|e| Error::config(format!("Failed to install subscriber: {}", e)))
}

/// Formats payload bytes as spaced hex for log lines
pub fn hex(bytes: &[u8]) -> String {
    bytes.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
