use serde::{Serialize, Deserialize};

use crate::core::{Address, Command};

/// One protocol message, independent of the wire representation
///
/// `address` names the peer: the sender on receive, the target on send.
/// Handlers rewrite it in place before handing the envelope back to the
/// transport.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Peer address
    pub address: Address,
    /// Raw command code, possibly one no table knows about
    pub command: u8,
    /// Payload bytes
    pub payload: Vec<u8>,
}

impl Envelope {
    /// Creates an envelope for `command` addressed to or from `address`
    pub fn new(address: Address, command: Command, payload: impl Into<Vec<u8>>) -> Self {
        Envelope {
            address,
            command: command.code(),
            payload: payload.into(),
        }
    }

    /// Clears every field back to its zero value
    pub fn reset(&mut self) {
        self.address = Address::UNASSIGNED;
        self.command = 0;
        self.payload.clear();
    }

    /// Returns the command if the code is a known one
    pub fn command(&self) -> Option<Command> {
        Command::from_code(self.command)
    }

    /// Returns the first payload byte, where verdicts are carried
    pub fn verdict(&self) -> Option<u8> {
        self.payload.first().copied()
    }

    /// Bytes this envelope occupies on air: address, command, payload
    pub fn wire_len(&self) -> usize {
        2 + self.payload.len()
    }
}
