//! Outbound delivery queue for the hub IPC link.
//!
//! Envelopes wait here until the link driver transmits them. The queue is bounded
//! (backpressure instead of unbounded growth) and counts requeues per entry so a
//! message that keeps going unacknowledged is eventually dropped and reported.

#![warn(clippy::all)]

pub mod config;
pub mod queue;
pub mod shared;

pub use config::{QueueConfig, RequeuePolicy, DEFAULT_CAPACITY, DEFAULT_MAX_RETRIES};
pub use queue::{DeliveryQueue, QueueEntry, QueueFull, QueueStats, RequeueOutcome};
pub use shared::SharedDeliveryQueue;
