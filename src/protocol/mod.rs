//! Protocol implementation module
//!
//! This module defines the envelope exchanged between coordinator and nodes,
//! its stream framing, the command tables that route envelopes to handlers,
//! and the payload hooks handlers call into.

pub mod codec;
pub mod envelope;
pub mod payload;
pub mod table;

pub use self::codec::{EnvelopeCodec, MAX_FRAME_SIZE};
pub use self::envelope::Envelope;
pub use self::payload::{NoPayload, PayloadDecoder, PayloadEncoder};
pub use self::table::{Cmd, CommandTable, Handler, TERMINATOR};

use crate::core::{Address, Command, Result, Ticks};
use crate::hal::Clock;
use crate::transport::Transport;

/// The channel a handler or poll talks through
///
/// Bundles the radio transport with the clock used to timestamp what it
/// hears.
pub struct Link<'a> {
    /// Radio transport
    pub transport: &'a mut dyn Transport,
    /// Time source
    pub clock: &'a dyn Clock,
}

impl<'a> Link<'a> {
    /// Creates a link over a transport and clock
    pub fn new(transport: &'a mut dyn Transport, clock: &'a dyn Clock) -> Self {
        Link { transport, clock }
    }

    /// Current clock reading
    pub fn now(&self) -> Ticks {
        self.clock.now()
    }

    /// Addresses `envelope` to `to` with `command` and transmits it as is
    pub fn send(&mut self, envelope: &mut Envelope, to: Address, command: Command) -> Result<usize> {
        envelope.address = to;
        envelope.command = command.code();
        self.transport.transmit(envelope)
    }

    /// Replaces the payload with a single byte and transmits the envelope
    pub fn send_byte(
        &mut self,
        envelope: &mut Envelope,
        to: Address,
        command: Command,
        byte: u8,
    ) -> Result<usize> {
        envelope.payload.clear();
        envelope.payload.push(byte);
        self.send(envelope, to, command)
    }
}
