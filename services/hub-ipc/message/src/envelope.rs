//! The typed message unit exchanged over the inter-processor link.

use crate::error::CodecError;
use crate::kind::MessageKind;
use crate::payload::Payload;
use rand::Rng;
use serde::ser::Error as _;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// Wire schema version stamped on locally built envelopes
pub const SCHEMA_VERSION: &str = "1.0.0";

const CORRELATION_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const CORRELATION_SUFFIX_LEN: usize = 7;

/// Generate a correlation id of the form `<epoch millis>-<7 base36 chars>`.
///
/// Unique with high probability; not a security token.
pub fn generate_correlation_id() -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..CORRELATION_SUFFIX_LEN)
        .map(|_| CORRELATION_ALPHABET[rng.gen_range(0..CORRELATION_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", now_millis(), suffix)
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Immutable message envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    version: String,
    correlation_id: String,
    timestamp: i64,
    payload: Payload,
}

/// Serialized envelope shape
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WireEnvelope<'a> {
    version: &'a str,
    #[serde(rename = "type")]
    kind: MessageKind,
    correlation_id: &'a str,
    timestamp: i64,
    payload: Value,
}

/// Received envelope before the kind is resolved
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    version: String,
    #[serde(rename = "type")]
    kind: String,
    correlation_id: String,
    timestamp: i64,
    #[serde(default)]
    payload: Value,
}

impl Envelope {
    /// Build an envelope with a fresh correlation id and the current time
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self::with_correlation_id(payload, generate_correlation_id())
    }

    /// Build an envelope carrying a caller-chosen correlation id
    pub fn with_correlation_id(payload: impl Into<Payload>, correlation_id: impl Into<String>) -> Self {
        Self {
            version: SCHEMA_VERSION.to_string(),
            correlation_id: correlation_id.into(),
            timestamp: now_millis(),
            payload: payload.into(),
        }
    }

    /// Build a response that reuses the request's correlation id
    pub fn reply_to(request: &Envelope, payload: impl Into<Payload>) -> Self {
        Self::with_correlation_id(payload, request.correlation_id.clone())
    }

    /// Assemble an envelope from explicit parts
    pub fn from_parts(
        version: impl Into<String>,
        correlation_id: impl Into<String>,
        timestamp: i64,
        payload: impl Into<Payload>,
    ) -> Self {
        Self {
            version: version.into(),
            correlation_id: correlation_id.into(),
            timestamp,
            payload: payload.into(),
        }
    }

    /// Schema version the sender stamped on the envelope
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Kind of the carried payload
    pub fn kind(&self) -> MessageKind {
        self.payload.kind()
    }

    /// Identifier shared by a request and its replies
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Sender wall-clock time, milliseconds since epoch
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// The typed payload
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn into_payload(self) -> Payload {
        self.payload
    }

    /// Whether the envelope's major schema version matches [`SCHEMA_VERSION`]
    pub fn is_compatible(&self) -> bool {
        major_version(&self.version).is_some()
            && major_version(&self.version) == major_version(SCHEMA_VERSION)
    }

    /// Serialize to the JSON text carried inside a frame
    pub fn to_json(&self) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(self).map_err(CodecError::Encode)
    }

    /// Parse the JSON text carried inside a frame
    pub fn from_json(bytes: &[u8]) -> Result<Self, CodecError> {
        let raw: RawEnvelope = serde_json::from_slice(bytes).map_err(CodecError::Malformed)?;
        let kind: MessageKind = raw
            .kind
            .parse()
            .map_err(|_| CodecError::UnknownKind(raw.kind.clone()))?;
        let payload = Payload::from_value(kind, raw.payload).map_err(CodecError::Malformed)?;

        Ok(Self {
            version: raw.version,
            correlation_id: raw.correlation_id,
            timestamp: raw.timestamp,
            payload,
        })
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let payload = self.payload.to_value().map_err(S::Error::custom)?;
        WireEnvelope {
            version: &self.version,
            kind: self.kind(),
            correlation_id: &self.correlation_id,
            timestamp: self.timestamp,
            payload,
        }
        .serialize(serializer)
    }
}

fn major_version(version: &str) -> Option<u64> {
    version.split('.').next()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ErrorPayload, PullNodeLogsPayload};
    use serde_json::json;

    #[test]
    fn test_generated_ids() {
        let id = generate_correlation_id();
        let (millis, suffix) = id.split_once('-').unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
        assert_eq!(suffix.len(), 7);
        assert!(suffix.bytes().all(|b| CORRELATION_ALPHABET.contains(&b)));
        assert_ne!(generate_correlation_id(), generate_correlation_id());
    }

    #[test]
    fn test_reply_reuses_correlation_id() {
        let request = Envelope::new(PullNodeLogsPayload {
            job_id: "job-1".into(),
            node_id: "aa:bb:cc:dd:ee:ff".into(),
            max_bytes: 2048,
        });
        let reply = Envelope::reply_to(
            &request,
            ErrorPayload {
                code: "NODE_UNREACHABLE".into(),
                message: "node did not answer".into(),
                details: None,
            },
        );
        assert_eq!(reply.correlation_id(), request.correlation_id());
        assert_eq!(reply.kind(), MessageKind::Error);
        assert_eq!(reply.version(), SCHEMA_VERSION);
    }

    #[test]
    fn test_serialized_shape() {
        let envelope = Envelope::from_parts("1.0.0", "hb-1", 1_700_000_000_123, Payload::Heartbeat);
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "version": "1.0.0",
                "type": "heartbeat",
                "correlationId": "hb-1",
                "timestamp": 1_700_000_000_123i64,
                "payload": {}
            })
        );
    }

    #[test]
    fn test_json_roundtrip() {
        let envelope = Envelope::with_correlation_id(
            ErrorPayload {
                code: "E42".into(),
                message: "queue overflow".into(),
                details: Some(json!({ "dropped": 3, "ratio": 0.125 })),
            },
            "err-1",
        );
        let bytes = envelope.to_json().unwrap();
        assert_eq!(Envelope::from_json(&bytes).unwrap(), envelope);
    }

    #[test]
    fn test_unknown_kind_is_distinct() {
        let bytes = br#"{"version":"1.1.0","type":"firmware_chunk","correlationId":"x","timestamp":1,"payload":{}}"#;
        match Envelope::from_json(bytes) {
            Err(CodecError::UnknownKind(kind)) => assert_eq!(kind, "firmware_chunk"),
            other => panic!("expected unknown kind, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_fields_are_malformed() {
        let no_id = br#"{"version":"1.0.0","type":"heartbeat","timestamp":1,"payload":{}}"#;
        assert!(matches!(Envelope::from_json(no_id), Err(CodecError::Malformed(_))));

        let wrong_shape = br#"{"version":"1.0.0","type":"pull_node_logs","correlationId":"x","timestamp":1,"payload":{"jobId":7}}"#;
        assert!(matches!(Envelope::from_json(wrong_shape), Err(CodecError::Malformed(_))));

        assert!(matches!(Envelope::from_json(b"not json"), Err(CodecError::Malformed(_))));
    }

    #[test]
    fn test_version_compatibility() {
        let same_major = Envelope::from_parts("1.4.2", "a", 0, Payload::Heartbeat);
        let newer_major = Envelope::from_parts("2.0.0", "b", 0, Payload::Heartbeat);
        let garbage = Envelope::from_parts("banana", "c", 0, Payload::Heartbeat);
        assert!(same_major.is_compatible());
        assert!(!newer_major.is_compatible());
        assert!(!garbage.is_compatible());
    }
}
