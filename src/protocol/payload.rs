use tracing::debug;

use crate::core::Result;
use super::envelope::Envelope;

/// Fills an outgoing envelope with this node's payload
pub trait PayloadEncoder {
    /// Writes the payload into `envelope`, leaving address and command alone
    fn encode(&mut self, envelope: &mut Envelope) -> Result<()>;
}

/// Interprets the payload of an incoming DATA envelope
pub trait PayloadDecoder {
    /// Consumes the payload carried by `envelope`
    fn decode(&mut self, envelope: &Envelope) -> Result<()>;
}

/// Encoder and decoder for nodes that carry no payload
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPayload;

impl PayloadEncoder for NoPayload {
    fn encode(&mut self, envelope: &mut Envelope) -> Result<()> {
        envelope.payload.clear();
        Ok(())
    }
}

impl PayloadDecoder for NoPayload {
    fn decode(&mut self, envelope: &Envelope) -> Result<()> {
        debug!(
            address = %envelope.address,
            len = envelope.payload.len(),
            "Discarding payload"
        );
        Ok(())
    }
}
