//! Envelope codec errors.

use ipc_wire::WireError;
use thiserror::Error;

/// Reasons a frame did not yield an envelope.
///
/// An incomplete frame is not an error; decoders report it as `Ok(None)`.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Complete frame whose checksum does not match its payload
    #[error("corrupt frame: checksum {expected:#010x} != computed {actual:#010x}")]
    Corrupt {
        /// Checksum carried by the frame
        expected: u32,
        /// Checksum computed over the payload
        actual: u32,
    },

    /// Declared or encoded payload exceeds the frame size limit
    #[error("frame payload of {0} bytes exceeds limit")]
    Oversize(usize),

    /// Checksum is fine but the payload is not a valid envelope
    #[error("malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    /// Envelope names a kind this build does not know
    #[error("unknown message kind {0:?}")]
    UnknownKind(String),

    /// Envelope could not be serialized
    #[error("envelope encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}

impl CodecError {
    /// Whether the frame failed its integrity check (retransmit candidate)
    pub fn is_corrupt(&self) -> bool {
        matches!(self, CodecError::Corrupt { .. })
    }
}

impl From<WireError> for CodecError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Checksum { expected, actual } => CodecError::Corrupt { expected, actual },
            WireError::Size(size) => CodecError::Oversize(size),
            WireError::Address(addr) => CodecError::Malformed(serde::de::Error::custom(format!(
                "invalid hardware address: {:?}",
                addr
            ))),
        }
    }
}
