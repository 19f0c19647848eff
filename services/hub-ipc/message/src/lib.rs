//! Typed message envelopes for the hub's BLE/cellular link.
//!
//! Every message crossing the link is an [`Envelope`]: schema version, kind,
//! correlation id, timestamp and a kind-specific [`Payload`]. Envelopes travel as JSON
//! inside `ipc-wire` frames; [`codec`] turns one into the other and keeps the decode
//! outcomes (incomplete, corrupt, malformed, unknown kind) apart.

#![warn(clippy::all)]

pub mod chunk;
pub mod codec;
pub mod envelope;
pub mod error;
pub mod kind;
pub mod payload;

pub use chunk::{
    ChunkError, LogChunker, LogReassembler, DEFAULT_LOG_CHUNK_SIZE, MAX_LOG_CHUNKS, MAX_PENDING_LOG_JOBS,
};
pub use codec::{decode, decode_with_limit, encode, encode_with_limit, EnvelopeDecoder};
pub use envelope::{generate_correlation_id, Envelope, SCHEMA_VERSION};
pub use error::CodecError;
pub use kind::{Direction, MessageKind, UnknownKind};
pub use payload::*;
