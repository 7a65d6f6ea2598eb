//! Test doubles shared by the unit tests

use std::collections::VecDeque;

use crate::core::{Error, Result};
use crate::protocol::Envelope;
use crate::transport::Transport;

/// Transport that keeps everything sent and replays a scripted inbox
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub sent: Vec<Envelope>,
    pub inbox: VecDeque<Envelope>,
    pub failing: bool,
    /// Receive calls that fail before the inbox is read
    pub recv_errors: usize,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        RecordingTransport {
            failing: true,
            ..Default::default()
        }
    }

    /// Takes and clears the sent log
    pub fn drain_sent(&mut self) -> Vec<Envelope> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for RecordingTransport {
    fn transmit(&mut self, envelope: &Envelope) -> Result<usize> {
        if self.failing {
            return Err(Error::transport("Simulated send failure"));
        }
        self.sent.push(envelope.clone());
        Ok(envelope.wire_len())
    }

    fn try_recv(&mut self) -> Result<Option<Envelope>> {
        if self.recv_errors > 0 {
            self.recv_errors -= 1;
            return Err(Error::codec("Simulated garbled frame"));
        }
        Ok(self.inbox.pop_front())
    }
}
