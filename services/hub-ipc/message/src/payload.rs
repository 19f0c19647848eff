//! Kind-specific payloads.
//!
//! [`Payload`] is a closed union with exactly one variant per [`MessageKind`], so a
//! payload can never disagree with the kind it travels under. Field names are camelCase
//! on the wire to match the JSON produced by the other processor.

use crate::kind::MessageKind;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ipc_wire::{FaultFlags, NodeAdvertisement, QualityFlags};
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Advertisement summary carried by [`NodeDiscoveredPayload`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvertisementSummary {
    pub battery_percent: u8,
    #[serde(serialize_with = "finite_f32")]
    pub last_reading: f32,
    pub fault_flags: FaultFlags,
    pub counter: u16,
}

/// A node advertisement was received by the hub scanner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDiscoveredPayload {
    pub node_id: String,
    pub rssi: i16,
    pub advertisement_data: AdvertisementSummary,
}

impl NodeDiscoveredPayload {
    /// Summarize a decoded advertisement together with the scanner's RSSI
    pub fn from_advertisement(adv: &NodeAdvertisement, rssi: i16) -> Self {
        Self {
            node_id: adv.node_id.to_string(),
            rssi,
            advertisement_data: AdvertisementSummary {
                battery_percent: adv.battery_percent,
                last_reading: adv.last_reading,
                fault_flags: adv.fault_flags,
                counter: adv.counter,
            },
        }
    }
}

// JSON has no NaN or infinity (serde_json writes `null`), so non-finite readings are
// an encode error.
fn finite_f32<S: Serializer>(value: &f32, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f32(*value)
    } else {
        Err(S::Error::custom(format!("non-finite reading {}", value)))
    }
}

fn finite_f64<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        Err(S::Error::custom(format!("non-finite reading {}", value)))
    }
}

/// A single sensor reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sample time, milliseconds since epoch
    pub timestamp: i64,
    #[serde(serialize_with = "finite_f64")]
    pub value: f64,
    pub unit: String,
    pub quality: QualityFlags,
}

/// Battery state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Battery {
    pub millivolts: u16,
    pub percent: u8,
}

/// Full telemetry sample from a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTelemetryPayload {
    pub node_id: String,
    /// Sensor group the node is assigned to (`machineId` on the wire)
    #[serde(rename = "machineId", default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub reading: Reading,
    pub battery: Battery,
    /// Fault names, see [`FaultFlags::names`]
    pub faults: Vec<String>,
    pub rssi: i16,
}

impl NodeTelemetryPayload {
    /// Fault list as a bitfield; unrecognized names are dropped
    pub fn fault_flags(&self) -> FaultFlags {
        FaultFlags::from_names(&self.faults)
    }
}

/// Sampling section of a node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SamplingConfig {
    pub interval_seconds: u32,
    pub warmup_ms: u32,
    pub burst_count: u32,
    pub aggregation: String,
}

/// Node configuration; sections left out are not changed on the node
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<SamplingConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calibration: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertisement: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faults: Option<Value>,
}

/// Push configuration to a node (cellular to BLE)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyNodeConfigPayload {
    pub job_id: String,
    pub node_id: String,
    pub config: NodeConfig,
    pub timeout_seconds: u32,
}

/// Result of an apply-config job (BLE to cellular)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeConfigResultPayload {
    pub job_id: String,
    pub node_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<i64>,
}

/// Request a node's logs (cellular to BLE)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullNodeLogsPayload {
    pub job_id: String,
    pub node_id: String,
    pub max_bytes: u32,
}

/// One chunk of a node log export (BLE to cellular)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeLogChunkPayload {
    pub job_id: String,
    pub node_id: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Base64 encoded log bytes
    pub data: String,
    pub complete: bool,
}

impl NodeLogChunkPayload {
    /// Build a chunk from raw log bytes; `complete` is set on the last chunk
    pub fn new(
        job_id: impl Into<String>,
        node_id: impl Into<String>,
        chunk_index: u32,
        total_chunks: u32,
        bytes: &[u8],
    ) -> Self {
        Self {
            job_id: job_id.into(),
            node_id: node_id.into(),
            chunk_index,
            total_chunks,
            data: BASE64.encode(bytes),
            complete: chunk_index.checked_add(1) == Some(total_chunks),
        }
    }

    /// Decode the base64 data field
    pub fn decode_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.data)
    }
}

/// Device twin desired-state change (cellular to BLE)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinDesiredUpdatePayload {
    /// Monotonic desired-state version
    pub version: u64,
    /// Full desired-state document
    pub desired: Value,
}

/// Partial reported-state document to publish (BLE to cellular)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TwinReportedUpdatePayload {
    pub reported: Value,
}

/// Batch of telemetry to publish upstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishTelemetryPayload {
    pub telemetry: Vec<NodeTelemetryPayload>,
    /// Batch time, milliseconds since epoch
    pub timestamp: i64,
}

/// Cellular link state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatusPayload {
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queued_messages: Option<u32>,
}

/// Error notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Kind-specific envelope payload
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    NodeDiscovered(NodeDiscoveredPayload),
    NodeTelemetry(NodeTelemetryPayload),
    ApplyNodeConfig(ApplyNodeConfigPayload),
    NodeConfigResult(NodeConfigResultPayload),
    PullNodeLogs(PullNodeLogsPayload),
    NodeLogChunk(NodeLogChunkPayload),
    TwinDesiredUpdate(TwinDesiredUpdatePayload),
    TwinReportedUpdate(TwinReportedUpdatePayload),
    PublishTelemetry(PublishTelemetryPayload),
    ConnectionStatus(ConnectionStatusPayload),
    /// Liveness only; serialized as an empty object
    Heartbeat,
    Error(ErrorPayload),
}

impl Payload {
    /// Kind this payload travels under
    pub fn kind(&self) -> MessageKind {
        match self {
            Payload::NodeDiscovered(_) => MessageKind::NodeDiscovered,
            Payload::NodeTelemetry(_) => MessageKind::NodeTelemetry,
            Payload::ApplyNodeConfig(_) => MessageKind::ApplyNodeConfig,
            Payload::NodeConfigResult(_) => MessageKind::NodeConfigResult,
            Payload::PullNodeLogs(_) => MessageKind::PullNodeLogs,
            Payload::NodeLogChunk(_) => MessageKind::NodeLogChunk,
            Payload::TwinDesiredUpdate(_) => MessageKind::TwinDesiredUpdate,
            Payload::TwinReportedUpdate(_) => MessageKind::TwinReportedUpdate,
            Payload::PublishTelemetry(_) => MessageKind::PublishTelemetry,
            Payload::ConnectionStatus(_) => MessageKind::ConnectionStatus,
            Payload::Heartbeat => MessageKind::Heartbeat,
            Payload::Error(_) => MessageKind::Error,
        }
    }

    /// Serialize the payload body to a JSON value
    pub fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            Payload::NodeDiscovered(p) => serde_json::to_value(p),
            Payload::NodeTelemetry(p) => serde_json::to_value(p),
            Payload::ApplyNodeConfig(p) => serde_json::to_value(p),
            Payload::NodeConfigResult(p) => serde_json::to_value(p),
            Payload::PullNodeLogs(p) => serde_json::to_value(p),
            Payload::NodeLogChunk(p) => serde_json::to_value(p),
            Payload::TwinDesiredUpdate(p) => serde_json::to_value(p),
            Payload::TwinReportedUpdate(p) => serde_json::to_value(p),
            Payload::PublishTelemetry(p) => serde_json::to_value(p),
            Payload::ConnectionStatus(p) => serde_json::to_value(p),
            Payload::Heartbeat => Ok(Value::Object(Map::new())),
            Payload::Error(p) => serde_json::to_value(p),
        }
    }

    /// Interpret a JSON payload body as the shape dictated by `kind`
    pub fn from_value(kind: MessageKind, value: Value) -> serde_json::Result<Self> {
        Ok(match kind {
            MessageKind::NodeDiscovered => Payload::NodeDiscovered(serde_json::from_value(value)?),
            MessageKind::NodeTelemetry => Payload::NodeTelemetry(serde_json::from_value(value)?),
            MessageKind::ApplyNodeConfig => {
                Payload::ApplyNodeConfig(serde_json::from_value(value)?)
            }
            MessageKind::NodeConfigResult => {
                Payload::NodeConfigResult(serde_json::from_value(value)?)
            }
            MessageKind::PullNodeLogs => Payload::PullNodeLogs(serde_json::from_value(value)?),
            MessageKind::NodeLogChunk => Payload::NodeLogChunk(serde_json::from_value(value)?),
            MessageKind::TwinDesiredUpdate => {
                Payload::TwinDesiredUpdate(serde_json::from_value(value)?)
            }
            MessageKind::TwinReportedUpdate => {
                Payload::TwinReportedUpdate(serde_json::from_value(value)?)
            }
            MessageKind::PublishTelemetry => {
                Payload::PublishTelemetry(serde_json::from_value(value)?)
            }
            MessageKind::ConnectionStatus => {
                Payload::ConnectionStatus(serde_json::from_value(value)?)
            }
            MessageKind::Heartbeat => Payload::Heartbeat,
            MessageKind::Error => Payload::Error(serde_json::from_value(value)?),
        })
    }
}

macro_rules! impl_from_payload {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Payload {
                fn from(p: $ty) -> Self {
                    Payload::$variant(p)
                }
            }
        )*
    };
}

impl_from_payload!(
    NodeDiscovered(NodeDiscoveredPayload),
    NodeTelemetry(NodeTelemetryPayload),
    ApplyNodeConfig(ApplyNodeConfigPayload),
    NodeConfigResult(NodeConfigResultPayload),
    PullNodeLogs(PullNodeLogsPayload),
    NodeLogChunk(NodeLogChunkPayload),
    TwinDesiredUpdate(TwinDesiredUpdatePayload),
    TwinReportedUpdate(TwinReportedUpdatePayload),
    PublishTelemetry(PublishTelemetryPayload),
    ConnectionStatus(ConnectionStatusPayload),
    Error(ErrorPayload),
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_advertisement() {
        let mut adv = NodeAdvertisement::new("01:02:03:0a:0b:0c".parse().unwrap(), 42, 19.5);
        adv.fault_flags = FaultFlags::LOW_BATTERY;
        adv.counter = 300;

        let discovered = NodeDiscoveredPayload::from_advertisement(&adv, -71);
        let value = serde_json::to_value(&discovered).unwrap();
        assert_eq!(
            value,
            json!({
                "nodeId": "01:02:03:0a:0b:0c",
                "rssi": -71,
                "advertisementData": {
                    "batteryPercent": 42,
                    "lastReading": 19.5,
                    "faultFlags": 16,
                    "counter": 300
                }
            })
        );
    }

    #[test]
    fn test_telemetry_wire_names() {
        let value = json!({
            "nodeId": "aa:bb:cc:dd:ee:01",
            "machineId": "pump-3",
            "reading": { "timestamp": 1735494000000i64, "value": 3.75, "unit": "bar", "quality": 7 },
            "battery": { "millivolts": 2950, "percent": 71 },
            "faults": ["sensor_high", "low_battery"],
            "rssi": -80
        });
        let payload = Payload::from_value(MessageKind::NodeTelemetry, value.clone()).unwrap();
        let Payload::NodeTelemetry(telemetry) = &payload else {
            panic!("wrong variant: {:?}", payload);
        };
        assert_eq!(telemetry.group_id.as_deref(), Some("pump-3"));
        assert_eq!(
            telemetry.fault_flags(),
            FaultFlags::SENSOR_HIGH | FaultFlags::LOW_BATTERY
        );
        assert_eq!(payload.to_value().unwrap(), value);
    }

    #[test]
    fn test_missing_field_rejected() {
        let value = json!({ "jobId": "job-1", "nodeId": "n" });
        assert!(Payload::from_value(MessageKind::PullNodeLogs, value).is_err());
    }

    #[test]
    fn test_optional_fields_omitted() {
        let payload = Payload::from(ConnectionStatusPayload {
            connected: true,
            reason: None,
            last_sync: Some(1_700_000_000_000),
            queued_messages: None,
        });
        assert_eq!(
            payload.to_value().unwrap(),
            json!({ "connected": true, "lastSync": 1_700_000_000_000i64 })
        );
    }

    #[test]
    fn test_heartbeat_is_empty_object() {
        assert_eq!(Payload::Heartbeat.to_value().unwrap(), json!({}));
        assert_eq!(
            Payload::from_value(MessageKind::Heartbeat, Value::Null).unwrap(),
            Payload::Heartbeat
        );
    }

    #[test]
    fn test_log_chunk_data() {
        let chunk = NodeLogChunkPayload::new("job-9", "node", 2, 3, b"boot ok\n");
        assert!(chunk.complete);
        assert_eq!(chunk.data, "Ym9vdCBvawo=");
        assert_eq!(chunk.decode_data().unwrap(), b"boot ok\n");
    }

    #[test]
    fn test_log_chunk_index_at_u32_max() {
        let chunk = NodeLogChunkPayload::new("job-9", "node", u32::MAX, u32::MAX, b"x");
        assert!(!chunk.complete);
        let chunk = NodeLogChunkPayload::new("job-9", "node", u32::MAX - 1, u32::MAX, b"x");
        assert!(chunk.complete);
    }

    #[test]
    fn test_kind_matches_variant() {
        let payload = Payload::from(PullNodeLogsPayload {
            job_id: "j".into(),
            node_id: "n".into(),
            max_bytes: 4096,
        });
        assert_eq!(payload.kind(), MessageKind::PullNodeLogs);
        assert_eq!(Payload::Heartbeat.kind(), MessageKind::Heartbeat);
    }
}
