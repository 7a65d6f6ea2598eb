//! Measurement payloads
//!
//! Nodes sample a sensor, tag the sample with whether it changed since the
//! last one sent (tracked through a rolling checksum kept in battery-backed
//! storage) and ship it in a DATA envelope. The coordinator turns those
//! payloads back into readings.

mod backup;
mod reading;

pub use self::backup::{BackupStore, FileBackup, MemoryBackup};
pub use self::reading::{MeasurementEncoder, Reading, ReadingDecoder};

use tracing::debug;

use crate::core::Result;

/// Source of raw measurement bytes
pub trait Sensor {
    /// Takes one sample
    fn sample(&mut self) -> Result<Vec<u8>>;
}

/// 16-bit rotating hash of `data`, seeded with zero
pub fn rotating_hash(data: &[u8]) -> u16 {
    data.iter()
        .fold(0u16, |rot, &byte| (rot << 4) ^ (rot >> 12) ^ u16::from(byte))
}

/// Detects whether a payload differs from the last one recorded
pub struct ChangeDetector<B> {
    backup: B,
}

impl<B: BackupStore> ChangeDetector<B> {
    pub fn new(backup: B) -> Self {
        ChangeDetector { backup }
    }

    /// Compares `data` with the stored checksum, storing the new one on change
    pub fn is_changed(&mut self, data: &[u8]) -> Result<bool> {
        let rot = rotating_hash(data);
        let prev = self.backup.load()?;
        debug!(prev, now = rot, "Payload checksum");

        if rot == prev {
            return Ok(false);
        }

        self.backup.store(rot)?;
        Ok(true)
    }

    /// Records `data` as the last payload unconditionally
    pub fn commit(&mut self, data: &[u8]) -> Result<()> {
        let rot = rotating_hash(data);
        debug!(rot, "Checksum committed");
        self.backup.store(rot)
    }

    pub fn into_inner(self) -> B {
        self.backup
    }
}
