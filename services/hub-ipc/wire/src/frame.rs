//! Length-prefixed, checksum-suffixed framing for the inter-processor link.
//!
//! ```text
//! +----------------------+----------------------------+
//! | u32 length (LE)      | byte length of payload      |
//! +----------------------+----------------------------+
//! | payload              | `length` bytes              |
//! +----------------------+----------------------------+
//! | u32 checksum (LE)    | CRC-32 over payload only    |
//! +----------------------+----------------------------+
//! ```
//!
//! Decoding distinguishes three outcomes: `Ok(None)` when more bytes are needed,
//! `Err(WireError::Checksum { .. })` when a complete frame fails its integrity check,
//! and `Ok(Some(frame))` for a verified payload.

use crate::checksum::checksum;
use crate::WireError;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::{debug, warn};

/// Bytes of framing around every payload (length prefix + checksum suffix)
pub const FRAME_OVERHEAD: usize = 8;

/// Size of the little-endian length prefix
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the little-endian checksum suffix
pub const CHECKSUM_SIZE: usize = 4;

/// Default maximum payload size accepted by the decoder (64 KiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// A verified frame payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    payload: Bytes,
}

impl Frame {
    /// Wrap a payload for transmission
    pub fn new(payload: Bytes) -> Self {
        Self { payload }
    }

    /// Payload section of the frame
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Consume the frame and return its payload
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Get the total frame size when encoded
    pub fn encoded_size(&self) -> usize {
        FRAME_OVERHEAD + self.payload.len()
    }

    /// Encode frame to a contiguous buffer
    pub fn encode(&self, max_frame_size: usize) -> Result<Bytes, WireError> {
        let len = self.payload.len();
        if len > max_frame_size || u32::try_from(len).is_err() {
            return Err(WireError::Size(len));
        }

        let mut buf = BytesMut::with_capacity(self.encoded_size());
        buf.put_u32_le(len as u32);
        buf.put_slice(&self.payload);
        buf.put_u32_le(checksum(&self.payload));

        Ok(buf.freeze())
    }

    /// Decode one frame from the start of `buf`.
    ///
    /// Returns the frame together with the number of bytes it occupied, so that callers
    /// holding a larger stream buffer know where the next frame starts.
    pub fn decode(buf: &[u8], max_frame_size: usize) -> Result<Option<(Frame, usize)>, WireError> {
        let Some(len) = peek_length(buf, max_frame_size)? else {
            return Ok(None);
        };

        let total = FRAME_OVERHEAD + len;
        if buf.len() < total {
            return Ok(None);
        }

        let payload = &buf[LENGTH_PREFIX_SIZE..LENGTH_PREFIX_SIZE + len];
        let mut trailer = &buf[LENGTH_PREFIX_SIZE + len..total];
        verify_payload(payload, trailer.get_u32_le())?;

        Ok(Some((Frame::new(Bytes::copy_from_slice(payload)), total)))
    }
}

/// Encode a payload as a frame using the default size limit
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, WireError> {
    Frame::new(Bytes::copy_from_slice(payload)).encode(DEFAULT_MAX_FRAME_SIZE)
}

/// Decode one frame from `buf` using the default size limit
pub fn decode_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, WireError> {
    Frame::decode(buf, DEFAULT_MAX_FRAME_SIZE)
}

/// Read the declared payload length, or `None` if the header is not complete yet.
fn peek_length(buf: &[u8], max_frame_size: usize) -> Result<Option<usize>, WireError> {
    if buf.len() < FRAME_OVERHEAD {
        return Ok(None);
    }

    let len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    if len > max_frame_size {
        return Err(WireError::Size(len));
    }

    Ok(Some(len))
}

fn verify_payload(payload: &[u8], expected: u32) -> Result<(), WireError> {
    let actual = checksum(payload);
    if actual != expected {
        return Err(WireError::Checksum { expected, actual });
    }
    Ok(())
}

/// Streaming frame decoder over a receive buffer
#[derive(Debug)]
pub struct FrameDecoder {
    max_frame_size: usize,
}

impl FrameDecoder {
    /// Create a new frame decoder
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Create a decoder with a custom payload size limit
    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Maximum payload size this decoder accepts
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }

    /// Decode one frame from a buffer.
    ///
    /// A corrupt frame is removed from `buf` before the error is returned, so the
    /// caller can keep polling. An oversized length prefix cannot be trusted to
    /// delimit anything; one byte is skipped and the decoder hunts for the next header.
    pub fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Frame>, WireError> {
        let len = match peek_length(buf, self.max_frame_size) {
            Ok(Some(len)) => len,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!("Dropping byte after oversized length prefix: {}", e);
                buf.advance(1);
                return Err(e);
            }
        };

        let total = FRAME_OVERHEAD + len;
        if buf.len() < total {
            buf.reserve(total - buf.len());
            return Ok(None);
        }

        let mut frame_buf = buf.split_to(total).freeze();
        frame_buf.advance(LENGTH_PREFIX_SIZE);
        let payload = frame_buf.split_to(len);
        let expected = frame_buf.get_u32_le();

        if let Err(e) = verify_payload(&payload, expected) {
            warn!("Discarding corrupt frame ({} bytes): {}", total, e);
            return Err(e);
        }

        debug!("Decoded frame with {} byte payload", len);
        Ok(Some(Frame::new(payload)))
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
