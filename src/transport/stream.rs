use std::io::{self, Read, Write};
use std::time::Duration;

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, warn};

use crate::core::{Error, Result};
use crate::protocol::{Envelope, EnvelopeCodec};
use super::Transport;

/// Transport framing envelopes over any byte stream
pub struct StreamTransport<S> {
    stream: S,
    codec: EnvelopeCodec,
    recv_buffer: BytesMut,
    send_buffer: BytesMut,
}

/// Transport over a serial-attached transceiver
pub type SerialTransport = StreamTransport<Box<dyn serialport::SerialPort>>;

impl SerialTransport {
    /// Opens a serial device at `baud_rate`
    ///
    /// Reads time out after `read_timeout`, which bounds how long
    /// [`Transport::try_recv`] can stall.
    pub fn open(path: &str, baud_rate: u32, read_timeout: Duration) -> Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(read_timeout)
            .open()
            .map_err(|e| Error::transport(format!("Failed to open {}: {}", path, e)))?;

        debug!(path, baud_rate, "Serial transport opened");
        Ok(StreamTransport::new(port))
    }
}

impl<S: Read + Write> StreamTransport<S> {
    /// Wraps a byte stream
    pub fn new(stream: S) -> Self {
        StreamTransport {
            stream,
            codec: EnvelopeCodec::new(),
            recv_buffer: BytesMut::with_capacity(256),
            send_buffer: BytesMut::with_capacity(128),
        }
    }

    /// Returns the underlying stream
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Pulls whatever bytes are available into the receive buffer
    fn fill(&mut self) -> Result<usize> {
        let mut chunk = [0u8; 64];
        match self.stream.read(&mut chunk) {
            Ok(n) => {
                self.recv_buffer.extend_from_slice(&chunk[..n]);
                Ok(n)
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl<S: Read + Write> Transport for StreamTransport<S> {
    fn transmit(&mut self, envelope: &Envelope) -> Result<usize> {
        self.send_buffer.clear();
        self.codec.encode(envelope.clone(), &mut self.send_buffer)?;
        self.stream.write_all(&self.send_buffer)?;
        self.stream.flush()?;
        Ok(self.send_buffer.len())
    }

    fn try_recv(&mut self) -> Result<Option<Envelope>> {
        // A complete frame may already be buffered from an earlier read
        if let Some(envelope) = self.codec.decode(&mut self.recv_buffer)? {
            return Ok(Some(envelope));
        }

        if self.fill()? == 0 {
            return Ok(None);
        }

        match self.codec.decode(&mut self.recv_buffer) {
            Ok(envelope) => Ok(envelope),
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                Err(e)
            }
        }
    }
}
