use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::core::{Error, MAX_PAYLOAD};
use super::envelope::Envelope;

/// Largest encoded envelope body accepted on a byte stream
pub const MAX_FRAME_SIZE: usize = 128;

/// Length-prefixed codec for carrying envelopes over a byte stream
#[derive(Clone, Default)]
pub struct EnvelopeCodec;

impl EnvelopeCodec {
    /// Creates a new envelope codec
    pub fn new() -> Self {
        EnvelopeCodec
    }
}

impl Decoder for EnvelopeCodec {
    type Item = Envelope;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < 4 {
            // Need more data to read frame length
            return Ok(None);
        }

        let mut length_bytes = [0u8; 4];
        length_bytes.copy_from_slice(&src[..4]);
        let length = u32::from_be_bytes(length_bytes) as usize;

        if length > MAX_FRAME_SIZE {
            // Drop what we have, the stream is out of sync
            src.clear();
            return Err(Error::codec(format!("Frame of {} bytes exceeds limit", length)));
        }

        if src.len() < 4 + length {
            src.reserve(4 + length - src.len());
            return Ok(None);
        }

        src.advance(4);
        let frame = src.split_to(length);

        let envelope: Envelope = bincode::deserialize(&frame)
            .map_err(|e| Error::codec(format!("Failed to deserialize envelope: {}", e)))?;

        if envelope.payload.len() > MAX_PAYLOAD {
            return Err(Error::codec(format!(
                "Payload of {} bytes exceeds limit",
                envelope.payload.len()
            )));
        }

        Ok(Some(envelope))
    }
}

impl Encoder<Envelope> for EnvelopeCodec {
    type Error = Error;

    fn encode(&mut self, item: Envelope, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.payload.len() > MAX_PAYLOAD {
            return Err(Error::codec(format!(
                "Payload of {} bytes exceeds limit",
                item.payload.len()
            )));
        }

        let bytes = bincode::serialize(&item)
            .map_err(|e| Error::codec(format!("Failed to serialize envelope: {}", e)))?;

        dst.reserve(4 + bytes.len());
        dst.put_u32(bytes.len() as u32);
        dst.extend_from_slice(&bytes);

        Ok(())
    }
}
