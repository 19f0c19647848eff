//! Wire protocol error types.

use thiserror::Error;

/// Wire protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    /// Trailing checksum disagrees with the payload (line noise, torn write)
    #[error("checksum mismatch: frame carries {expected:#010x}, payload hashes to {actual:#010x}")]
    Checksum {
        /// Checksum carried by the frame
        expected: u32,
        /// Checksum recomputed over the received payload
        actual: u32,
    },

    /// Size limit exceeded
    #[error("size limit exceeded: {0}")]
    Size(usize),

    /// Hardware address could not be parsed
    #[error("invalid hardware address: {0:?}")]
    Address(String),
}
