//! Hub IPC diagnostic binary.
//!
//! Builds and inspects link frames, envelopes and node advertisements, and replays
//! captured link traffic through the streaming decoder and delivery queue.

use anyhow::{bail, Context};
use bytes::BytesMut;
use clap::{Parser, Subcommand};
use ipc_message::{
    decode_with_limit, encode_with_limit, generate_correlation_id, CodecError, Envelope,
    EnvelopeDecoder, LogChunker, MessageKind, Payload,
};
use ipc_queue::{DeliveryQueue, QueueStats};
use ipc_wire::{FaultFlags, NodeAddress, NodeAdvertisement, ADVERTISEMENT_VERSION, NORDIC_COMPANY_ID};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod logging;

use config::HubIpcConfig;
use logging::HubLogFormatter;

/// BLE sensor hub IPC tool
#[derive(Parser, Debug)]
#[command(name = "hub-ipc", version, about = "Inspect and replay BLE hub IPC traffic")]
struct Args {
    /// Configuration file path
    #[arg(long, global = true, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build an envelope and print its frame as hex
    Encode {
        /// Message kind, e.g. heartbeat or node_telemetry
        #[arg(long)]
        kind: String,
        /// Payload JSON
        #[arg(long, default_value = "{}")]
        payload: String,
        /// Correlation id; generated when omitted
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Decode a hex frame and print the outcome
    Decode {
        hex: String,
    },

    /// Print a node advertisement as hex
    AdvEncode {
        /// Node address, e.g. aa:bb:cc:dd:ee:ff
        #[arg(long)]
        node_id: NodeAddress,
        #[arg(long)]
        battery: u8,
        #[arg(long)]
        reading: f32,
        /// Company id, decimal or 0x-prefixed hex
        #[arg(long, value_parser = parse_u16, default_value_t = NORDIC_COMPANY_ID)]
        company_id: u16,
        #[arg(long, default_value_t = ADVERTISEMENT_VERSION)]
        version: u8,
        /// Fault names, comma separated (e.g. sensor_high,low_battery)
        #[arg(long, value_delimiter = ',')]
        faults: Vec<String>,
        #[arg(long, default_value_t = 0)]
        counter: u16,
    },

    /// Decode a hex node advertisement and print it as JSON
    AdvDecode {
        hex: String,
        /// Receiver-side signal strength to attach
        #[arg(long, allow_hyphen_values = true)]
        rssi: Option<i16>,
    },

    /// Stream a binary link capture through the decoder into a delivery queue
    Replay {
        file: PathBuf,
    },

    /// Split a log file into node log chunk frames, one hex frame per line
    ChunkLog {
        file: PathBuf,
        #[arg(long)]
        job_id: String,
        #[arg(long)]
        node_id: String,
        /// Only the most recent bytes of the log are exported
        #[arg(long, default_value_t = u32::MAX)]
        max_bytes: u32,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!(
            "warn,hub_ipc={level},ipc_wire={level},ipc_message={level},ipc_queue={level}",
            level = args.log_level
        ))
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .event_format(HubLogFormatter::new("hub-ipc"))
        .init();

    info!("Starting hub-ipc v{}", env!("CARGO_PKG_VERSION"));

    let config = HubIpcConfig::load_from_file(&args.config)?;

    match args.command {
        Command::Encode {
            kind,
            payload,
            correlation_id,
        } => encode_envelope(&config, &kind, &payload, correlation_id),
        Command::Decode { hex } => decode_envelope(&config, &hex),
        Command::AdvEncode {
            node_id,
            battery,
            reading,
            company_id,
            version,
            faults,
            counter,
        } => {
            let mut adv = NodeAdvertisement::new(node_id, battery, reading);
            adv.company_id = company_id;
            adv.version = version;
            adv.fault_flags = parse_faults(&faults)?;
            adv.counter = counter;
            println!("{}", hex::encode(adv.encode()));
            Ok(())
        }
        Command::AdvDecode { hex, rssi } => decode_advertisement(&hex, rssi),
        Command::Replay { file } => {
            let summary = replay(&config, &file)?;
            println!("{}", summary);
            Ok(())
        }
        Command::ChunkLog {
            file,
            job_id,
            node_id,
            max_bytes,
        } => chunk_log(&config, &file, &job_id, &node_id, max_bytes),
    }
}

fn encode_envelope(
    config: &HubIpcConfig,
    kind: &str,
    payload: &str,
    correlation_id: Option<String>,
) -> anyhow::Result<()> {
    let kind: MessageKind = kind.parse()?;
    let value: serde_json::Value =
        serde_json::from_str(payload).context("payload is not valid JSON")?;
    let payload = Payload::from_value(kind, value)
        .with_context(|| format!("payload does not match the {} shape", kind))?;

    let envelope = Envelope::from_parts(
        config.schema_version.as_str(),
        correlation_id.unwrap_or_else(generate_correlation_id),
        chrono::Utc::now().timestamp_millis(),
        payload,
    );
    let frame = encode_with_limit(&envelope, config.max_frame_size)?;

    component_info!(
        "codec",
        "Encoded {} envelope {} into {} bytes",
        kind,
        envelope.correlation_id(),
        frame.len()
    );
    println!("{}", hex::encode(&frame));
    Ok(())
}

fn decode_envelope(config: &HubIpcConfig, input: &str) -> anyhow::Result<()> {
    let bytes = hex::decode(input.trim()).context("frame is not valid hex")?;

    match decode_with_limit(&bytes, config.max_frame_size) {
        Ok(Some(envelope)) => {
            if !envelope.is_compatible() {
                component_warn!(
                    "codec",
                    "Envelope schema {} is incompatible with this build",
                    envelope.version()
                );
            }
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Ok(None) => println!("incomplete: {} bytes buffered", bytes.len()),
        Err(e @ CodecError::Corrupt { .. }) => println!("corrupt: {}", e),
        Err(e @ CodecError::Oversize(_)) => println!("oversize: {}", e),
        Err(CodecError::UnknownKind(kind)) => println!("unknown kind: {}", kind),
        Err(e) => println!("malformed: {}", e),
    }
    Ok(())
}

fn decode_advertisement(input: &str, rssi: Option<i16>) -> anyhow::Result<()> {
    let bytes = hex::decode(input.trim()).context("advertisement is not valid hex")?;
    let Some(mut adv) = NodeAdvertisement::decode(&bytes) else {
        bail!(
            "advertisement must be {} bytes, got {}",
            ipc_wire::ADVERTISEMENT_SIZE,
            bytes.len()
        );
    };
    if let Some(rssi) = rssi {
        adv = adv.with_rssi(rssi);
    }

    let output = serde_json::json!({
        "advertisement": adv,
        "faults": adv.fault_flags.names(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Counters from one replay run
#[derive(Debug, Default)]
struct ReplaySummary {
    decoded: usize,
    corrupt: usize,
    oversize: usize,
    malformed: usize,
    unknown: usize,
    shed: usize,
    trailing_bytes: usize,
    queue: QueueStats,
}

impl std::fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "decoded={} corrupt={} oversize={} malformed={} unknown={} shed={} trailing_bytes={} pending={}",
            self.decoded,
            self.corrupt,
            self.oversize,
            self.malformed,
            self.unknown,
            self.shed,
            self.trailing_bytes,
            self.queue.pending
        )
    }
}

fn replay(config: &HubIpcConfig, path: &Path) -> anyhow::Result<ReplaySummary> {
    let capture = std::fs::read(path).with_context(|| format!("reading capture {:?}", path))?;
    component_info!("replay", "Replaying {} bytes from {:?}", capture.len(), path);

    let mut buf = BytesMut::from(&capture[..]);
    let mut decoder = EnvelopeDecoder::with_max_frame_size(config.max_frame_size);
    let mut queue = DeliveryQueue::with_config(config.queue.clone());
    let mut summary = ReplaySummary::default();

    loop {
        match decoder.decode(&mut buf) {
            Ok(Some(envelope)) => {
                summary.decoded += 1;
                if let Err(full) = queue.enqueue(envelope) {
                    component_debug!("replay", "Shed {}", full.envelope.correlation_id());
                    summary.shed += 1;
                }
            }
            Ok(None) => break,
            Err(CodecError::Corrupt { .. }) => summary.corrupt += 1,
            Err(CodecError::Oversize(_)) => summary.oversize += 1,
            Err(CodecError::UnknownKind(_)) => summary.unknown += 1,
            Err(_) => summary.malformed += 1,
        }
    }

    summary.trailing_bytes = buf.len();
    summary.queue = queue.stats();
    if summary.trailing_bytes > 0 {
        component_warn!(
            "replay",
            "Capture ends with {} bytes of an incomplete frame",
            summary.trailing_bytes
        );
    }
    Ok(summary)
}

fn chunk_log(
    config: &HubIpcConfig,
    path: &Path,
    job_id: &str,
    node_id: &str,
    max_bytes: u32,
) -> anyhow::Result<()> {
    let log = std::fs::read(path).with_context(|| format!("reading log {:?}", path))?;
    let chunks = LogChunker::with_chunk_size(config.log_chunk_size)
        .chunk_log(job_id, node_id, &log, max_bytes);

    component_info!("logs", "Exporting job {} as {} chunks", job_id, chunks.len());
    for chunk in chunks {
        let envelope = Envelope::from_parts(
            config.schema_version.as_str(),
            generate_correlation_id(),
            chrono::Utc::now().timestamp_millis(),
            chunk,
        );
        println!("{}", hex::encode(encode_with_limit(&envelope, config.max_frame_size)?));
    }
    Ok(())
}

fn parse_faults(names: &[String]) -> anyhow::Result<FaultFlags> {
    for name in names {
        if FaultFlags::from_name(&name.to_ascii_uppercase()).is_none() {
            bail!("unknown fault {:?}", name);
        }
    }
    Ok(FaultFlags::from_names(names))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid u16 {:?}: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipc_message::{encode, NodeLogChunkPayload};
    use ipc_wire::checksum;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn heartbeat(id: &str) -> Vec<u8> {
        encode(&Envelope::with_correlation_id(Payload::Heartbeat, id))
            .unwrap()
            .to_vec()
    }

    fn raw_frame(json: &[u8]) -> Vec<u8> {
        let mut out = (json.len() as u32).to_le_bytes().to_vec();
        out.extend_from_slice(json);
        out.extend_from_slice(&checksum(json).to_le_bytes());
        out
    }

    #[test]
    fn test_replay_counts_outcomes() {
        let mut capture = heartbeat("hb-1");

        let mut corrupt = heartbeat("hb-2");
        corrupt[6] ^= 0x01;
        capture.extend(corrupt);

        capture.extend(raw_frame(b"{not json"));
        capture.extend(raw_frame(
            br#"{"version":"1.0.0","type":"firmware_update","correlationId":"x","timestamp":0,"payload":{}}"#,
        ));
        capture.extend(heartbeat("hb-3"));
        capture.extend(&heartbeat("hb-4")[..5]);

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&capture).unwrap();

        let summary = replay(&HubIpcConfig::default(), file.path()).unwrap();
        assert_eq!(summary.decoded, 2);
        assert_eq!(summary.corrupt, 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.shed, 0);
        assert_eq!(summary.trailing_bytes, 5);
        assert_eq!(summary.queue.pending, 2);
    }

    #[test]
    fn test_replay_sheds_when_queue_full() {
        let mut config = HubIpcConfig::default();
        config.queue.capacity = 2;

        let mut file = NamedTempFile::new().unwrap();
        for i in 0..5 {
            file.write_all(&heartbeat(&format!("hb-{}", i))).unwrap();
        }

        let summary = replay(&config, file.path()).unwrap();
        assert_eq!(summary.decoded, 5);
        assert_eq!(summary.shed, 3);
        assert_eq!(summary.queue.pending, 2);
        assert_eq!(summary.queue.rejected, 3);
    }

    #[test]
    fn test_replay_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(replay(&HubIpcConfig::default(), &dir.path().join("none.bin")).is_err());
    }

    #[test]
    fn test_parse_faults() {
        let flags = parse_faults(&["sensor_high".to_string(), "low_battery".to_string()]).unwrap();
        assert_eq!(flags, FaultFlags::SENSOR_HIGH | FaultFlags::LOW_BATTERY);
        assert!(parse_faults(&["overheated".to_string()]).is_err());
        assert_eq!(parse_faults(&[]).unwrap(), FaultFlags::empty());
    }

    #[test]
    fn test_parse_u16() {
        assert_eq!(parse_u16("0x0059"), Ok(0x0059));
        assert_eq!(parse_u16("89"), Ok(89));
        assert!(parse_u16("0x10000").is_err());
        assert!(parse_u16("nordic").is_err());
    }

    #[test]
    fn test_chunk_payload_fits_default_frame() {
        let config = HubIpcConfig::default();
        let chunk = NodeLogChunkPayload::new("job", "node", 0, 1, &vec![0xAB; config.log_chunk_size]);
        let envelope = Envelope::new(chunk);
        assert!(encode_with_limit(&envelope, config.max_frame_size).is_ok());
    }

    #[test]
    fn test_args_parse() {
        let args = Args::try_parse_from([
            "hub-ipc",
            "adv-decode",
            "59000101020304050655000000000100",
            "--rssi",
            "-70",
        ])
        .unwrap();
        match args.command {
            Command::AdvDecode { rssi, .. } => assert_eq!(rssi, Some(-70)),
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.config, PathBuf::from("config.yaml"));
    }
}
