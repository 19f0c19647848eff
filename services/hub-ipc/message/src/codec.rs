//! Envelope encoding and decoding over link frames.
//!
//! A decode yields one of four outcomes the caller can act on:
//!
//! | Outcome | Value | Caller action |
//! |---|---|---|
//! | Incomplete | `Ok(None)` | wait for more bytes |
//! | Corrupt | `Err(CodecError::Corrupt { .. })` | discard, request retransmit |
//! | Malformed / unknown kind | `Err(CodecError::Malformed(_))`, `Err(CodecError::UnknownKind(_))` | discard, surface diagnostic |
//! | Success | `Ok(Some(envelope))` | dispatch by kind |

use crate::envelope::Envelope;
use crate::error::CodecError;
use bytes::{Bytes, BytesMut};
use ipc_wire::{Frame, FrameDecoder, DEFAULT_MAX_FRAME_SIZE};
use tracing::{debug, warn};

/// Serialize and frame an envelope using the default size limit
pub fn encode(envelope: &Envelope) -> Result<Bytes, CodecError> {
    encode_with_limit(envelope, DEFAULT_MAX_FRAME_SIZE)
}

/// Serialize and frame an envelope, refusing payloads above `max_frame_size`
pub fn encode_with_limit(envelope: &Envelope, max_frame_size: usize) -> Result<Bytes, CodecError> {
    let json = envelope.to_json()?;
    let bytes = Frame::new(Bytes::from(json)).encode(max_frame_size)?;
    debug!(
        "Encoded {} envelope {} ({} bytes)",
        envelope.kind(),
        envelope.correlation_id(),
        bytes.len()
    );
    Ok(bytes)
}

/// Decode one framed envelope from the start of `buf` using the default size limit
pub fn decode(buf: &[u8]) -> Result<Option<Envelope>, CodecError> {
    decode_with_limit(buf, DEFAULT_MAX_FRAME_SIZE)
}

/// Decode one framed envelope from the start of `buf`
pub fn decode_with_limit(buf: &[u8], max_frame_size: usize) -> Result<Option<Envelope>, CodecError> {
    match Frame::decode(buf, max_frame_size)? {
        Some((frame, _)) => Envelope::from_json(frame.payload()).map(Some),
        None => Ok(None),
    }
}

/// Streaming envelope decoder over a receive buffer
#[derive(Debug, Default)]
pub struct EnvelopeDecoder {
    frames: FrameDecoder,
}

impl EnvelopeDecoder {
    /// Create a decoder with the default frame size limit
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a custom frame size limit
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            frames: FrameDecoder::with_max_frame_size(max_frame_size),
        }
    }

    /// Decode the next envelope from `buf`.
    ///
    /// Every complete frame is consumed from `buf`, whether or not it decodes, so one
    /// bad frame never stalls the stream.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Envelope>, CodecError> {
        let Some(frame) = self.frames.decode(buf)? else {
            return Ok(None);
        };

        match Envelope::from_json(frame.payload()) {
            Ok(envelope) => Ok(Some(envelope)),
            Err(e) => {
                warn!("Discarding undecodable frame: {}", e);
                Err(e)
            }
        }
    }
}
