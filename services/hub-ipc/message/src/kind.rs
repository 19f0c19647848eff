//! Message kinds exchanged between the BLE and cellular processors.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Which processor originates a message kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// BLE processor to cellular processor
    BleToCellular,
    /// Cellular processor to BLE processor
    CellularToBle,
    /// Either side may send it
    Either,
}

/// Message kind discriminant, serialized as the envelope `type` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// A node advertisement was seen
    NodeDiscovered,
    /// Full telemetry sample from a node
    NodeTelemetry,
    /// Push configuration to a node
    ApplyNodeConfig,
    /// Outcome of a configuration job
    NodeConfigResult,
    /// Request a node's logs
    PullNodeLogs,
    /// One chunk of a node's logs
    NodeLogChunk,
    /// Cloud desired-state change
    TwinDesiredUpdate,
    /// Reported-state change to publish
    TwinReportedUpdate,
    /// Batch of telemetry to publish
    PublishTelemetry,
    /// Cellular connection state change
    ConnectionStatus,
    /// Liveness probe
    Heartbeat,
    /// Error notification
    Error,
}

/// Unrecognized message kind name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown message kind {0:?}")]
pub struct UnknownKind(pub String);

impl MessageKind {
    /// Every kind in catalogue order
    pub const ALL: [MessageKind; 12] = [
        MessageKind::NodeDiscovered,
        MessageKind::NodeTelemetry,
        MessageKind::ApplyNodeConfig,
        MessageKind::NodeConfigResult,
        MessageKind::PullNodeLogs,
        MessageKind::NodeLogChunk,
        MessageKind::TwinDesiredUpdate,
        MessageKind::TwinReportedUpdate,
        MessageKind::PublishTelemetry,
        MessageKind::ConnectionStatus,
        MessageKind::Heartbeat,
        MessageKind::Error,
    ];

    /// Wire name of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::NodeDiscovered => "node_discovered",
            MessageKind::NodeTelemetry => "node_telemetry",
            MessageKind::ApplyNodeConfig => "apply_node_config",
            MessageKind::NodeConfigResult => "node_config_result",
            MessageKind::PullNodeLogs => "pull_node_logs",
            MessageKind::NodeLogChunk => "node_log_chunk",
            MessageKind::TwinDesiredUpdate => "twin_desired_update",
            MessageKind::TwinReportedUpdate => "twin_reported_update",
            MessageKind::PublishTelemetry => "publish_telemetry",
            MessageKind::ConnectionStatus => "connection_status",
            MessageKind::Heartbeat => "heartbeat",
            MessageKind::Error => "error",
        }
    }

    /// Which processor sends this kind
    pub fn direction(&self) -> Direction {
        match self {
            MessageKind::NodeDiscovered
            | MessageKind::NodeTelemetry
            | MessageKind::NodeConfigResult
            | MessageKind::NodeLogChunk
            | MessageKind::TwinReportedUpdate
            | MessageKind::PublishTelemetry => Direction::BleToCellular,
            MessageKind::ApplyNodeConfig
            | MessageKind::PullNodeLogs
            | MessageKind::TwinDesiredUpdate => Direction::CellularToBle,
            MessageKind::ConnectionStatus | MessageKind::Heartbeat | MessageKind::Error => {
                Direction::Either
            }
        }
    }
}

impl FromStr for MessageKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MessageKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
