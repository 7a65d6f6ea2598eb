use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::debug;

use crate::core::{Address, Error, Result, MAX_PAYLOAD};
use crate::protocol::{Envelope, PayloadDecoder, PayloadEncoder};
use super::backup::BackupStore;
use super::{ChangeDetector, Sensor};

/// Builds DATA payloads as `[changed, sample...]`
///
/// The leading byte is `1` when the sample differs from the one sent
/// before the last power cycle, `0` otherwise.
pub struct MeasurementEncoder<S, B> {
    sensor: S,
    detector: ChangeDetector<B>,
}

impl<S: Sensor, B: BackupStore> MeasurementEncoder<S, B> {
    pub fn new(sensor: S, backup: B) -> Self {
        MeasurementEncoder {
            sensor,
            detector: ChangeDetector::new(backup),
        }
    }
}

impl<S: Sensor, B: BackupStore> PayloadEncoder for MeasurementEncoder<S, B> {
    fn encode(&mut self, envelope: &mut Envelope) -> Result<()> {
        let sample = self.sensor.sample()?;
        if sample.len() + 1 > MAX_PAYLOAD {
            return Err(Error::sensor(format!(
                "Sample of {} bytes does not fit a payload",
                sample.len()
            )));
        }

        let changed = self.detector.is_changed(&sample)?;

        envelope.payload.clear();
        envelope.payload.push(changed as u8);
        envelope.payload.extend_from_slice(&sample);
        Ok(())
    }
}

/// One decoded sensor reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    /// Node that sent it
    pub address: Address,
    /// Whether the node saw a new value
    pub changed: bool,
    /// Raw sample bytes
    pub data: Bytes,
}

/// Coordinator-side decoder forwarding readings to the application
pub struct ReadingDecoder {
    tx: mpsc::UnboundedSender<Reading>,
}

impl ReadingDecoder {
    /// Creates a decoder and the receiver its readings arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Reading>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ReadingDecoder { tx }, rx)
    }
}

impl PayloadDecoder for ReadingDecoder {
    fn decode(&mut self, envelope: &Envelope) -> Result<()> {
        let (flag, data) = envelope.payload.split_first()
            .ok_or_else(|| Error::codec(format!("Empty data payload from {}", envelope.address)))?;

        let reading = Reading {
            address: envelope.address,
            changed: *flag != 0,
            data: Bytes::copy_from_slice(data),
        };
        debug!(address = %reading.address, changed = reading.changed, len = data.len(), "Reading");

        self.tx.send(reading)
            .map_err(|_| Error::invalid_state("Reading consumer dropped"))
    }
}
