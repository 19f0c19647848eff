//! Delivery queue configuration.

use serde::{Deserialize, Serialize};

/// Default maximum number of pending envelopes
pub const DEFAULT_CAPACITY: usize = 100;

/// Default retry ceiling
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Where a requeued entry goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequeuePolicy {
    /// Entry keeps its original FIFO position
    #[default]
    KeepPosition,
    /// Entry moves to the head so it is retried next
    MoveToFront,
}

impl std::str::FromStr for RequeuePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep_position" => Ok(RequeuePolicy::KeepPosition),
            "move_to_front" => Ok(RequeuePolicy::MoveToFront),
            other => Err(format!("unknown requeue policy {:?}", other)),
        }
    }
}

/// Configuration for delivery queue behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending envelopes
    pub capacity: usize,
    /// Requeue attempts before an entry is dropped
    pub max_retries: u32,
    /// Placement of requeued entries
    pub requeue_policy: RequeuePolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_retries: DEFAULT_MAX_RETRIES,
            requeue_policy: RequeuePolicy::KeepPosition,
        }
    }
}
