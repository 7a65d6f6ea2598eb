//! Radio transport module
//!
//! This module defines how envelopes leave and reach a device, and provides
//! host-side transports: in-memory channels for simulation and a framed
//! byte stream for serial-attached transceivers.

mod stream;

pub use self::stream::{SerialTransport, StreamTransport};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tracing::trace;

use crate::core::{Error, Result};
use crate::protocol::Envelope;

/// Half-duplex link to the radio
pub trait Transport {
    /// Sends an envelope, returning the number of bytes put on air
    fn transmit(&mut self, envelope: &Envelope) -> Result<usize>;

    /// Returns the next received envelope without blocking
    fn try_recv(&mut self) -> Result<Option<Envelope>>;
}

/// In-memory transport joined to exactly one peer endpoint
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
}

impl ChannelTransport {
    /// Creates two endpoints that hear each other
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::unbounded_channel();
        let (b_tx, a_rx) = mpsc::unbounded_channel();

        (
            ChannelTransport { tx: a_tx, rx: a_rx },
            ChannelTransport { tx: b_tx, rx: b_rx },
        )
    }
}

impl Transport for ChannelTransport {
    fn transmit(&mut self, envelope: &Envelope) -> Result<usize> {
        self.tx.send(envelope.clone())
            .map_err(|_| Error::transport("Peer endpoint closed"))?;
        trace!(address = %envelope.address, command = envelope.command, "Envelope queued");
        Ok(envelope.wire_len())
    }

    fn try_recv(&mut self) -> Result<Option<Envelope>> {
        match self.rx.try_recv() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(Error::transport("Peer endpoint closed")),
        }
    }
}
