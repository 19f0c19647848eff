//! Wire framing, integrity checking and advertisement packing for the hub IPC link.
//!
//! Each hub runs a BLE processor and a cellular processor joined by a narrow serial
//! link. This crate owns the byte-level formats on both sides of that link:
//!
//! - **Integrity**: CRC-32 (ISO-HDLC) over every frame payload
//! - **Framing**: length-prefixed, checksum-suffixed frames with a streaming decoder
//! - **Advertisements**: the 17-byte summary each sensor node broadcasts
//! - **GATT identifiers**: service/characteristic UUIDs and command codes
//!
//! ## Wire Format
//!
//! ```text
//! +----------------------+----------------------------+
//! | u32 length (LE)      | payload byte count          |
//! +----------------------+----------------------------+
//! | payload              | serialized envelope         |
//! +----------------------+----------------------------+
//! | u32 checksum (LE)    | CRC-32 of payload           |
//! +----------------------+----------------------------+
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod advertisement;
pub mod checksum;
pub mod error;
pub mod flags;
pub mod frame;
pub mod gatt;

// Re-export main types
pub use advertisement::{
    NodeAddress, NodeAdvertisement, ADVERTISEMENT_SIZE, ADVERTISEMENT_VERSION, NORDIC_COMPANY_ID,
};
pub use checksum::{checksum, verify};
pub use error::WireError;
pub use flags::{FaultFlags, QualityFlags};
pub use frame::{
    decode_frame, encode_frame, Frame, FrameDecoder, DEFAULT_MAX_FRAME_SIZE, FRAME_OVERHEAD,
};
pub use gatt::{short_uuid, HubScanCommand, NodeCommand, NodeState};
