//! Configuration handling for the hub IPC tool.
//!
//! Settings come from the `services.hub_ipc` section of the shared YAML config file,
//! then environment variables override individual values.

use anyhow::Result;
use ipc_message::{DEFAULT_LOG_CHUNK_SIZE, SCHEMA_VERSION};
use ipc_queue::{QueueConfig, RequeuePolicy};
use ipc_wire::DEFAULT_MAX_FRAME_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

/// Hub IPC configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubIpcConfig {
    /// Delivery queue settings
    pub queue: QueueConfig,
    /// Largest frame payload accepted or produced, in bytes
    pub max_frame_size: usize,
    /// Schema version stamped on envelopes this tool builds
    pub schema_version: String,
    /// Raw bytes per exported log chunk
    pub log_chunk_size: usize,
}

impl Default for HubIpcConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            schema_version: SCHEMA_VERSION.to_string(),
            log_chunk_size: DEFAULT_LOG_CHUNK_SIZE,
        }
    }
}

/// Root configuration structure (matches the YAML structure)
#[derive(Debug, Deserialize)]
struct RootConfig {
    services: Option<ServicesConfig>,
}

#[derive(Debug, Deserialize)]
struct ServicesConfig {
    hub_ipc: Option<HubIpcConfig>,
}

impl HubIpcConfig {
    /// Load configuration from file and environment variables
    pub fn load_from_file<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let mut config = Self::default();

        if let Ok(content) = std::fs::read_to_string(&config_path) {
            match serde_yaml::from_str::<RootConfig>(&content) {
                Ok(root) => {
                    if let Some(section) = root.services.and_then(|s| s.hub_ipc) {
                        config = section;
                    }
                    info!("Loaded configuration from {:?}", config_path.as_ref());
                }
                Err(e) => {
                    warn!(
                        "Failed to parse config file {:?} ({}), using defaults",
                        config_path.as_ref(),
                        e
                    );
                }
            }
        } else {
            warn!("Config file {:?} not found, using defaults", config_path.as_ref());
        }

        config.apply_environment_overrides();

        info!(
            "Final hub IPC configuration: capacity={}, max_retries={}, requeue_policy={:?}, max_frame_size={}",
            config.queue.capacity,
            config.queue.max_retries,
            config.queue.requeue_policy,
            config.max_frame_size
        );

        Ok(config)
    }

    fn apply_environment_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`; unparsable values are ignored with a warning
    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("HUB_IPC_QUEUE_CAPACITY") {
            match value.parse::<usize>() {
                Ok(capacity) => {
                    self.queue.capacity = capacity;
                    info!("Queue capacity overridden by environment: {}", capacity);
                }
                Err(_) => warn!("Ignoring invalid HUB_IPC_QUEUE_CAPACITY {:?}", value),
            }
        }

        if let Some(value) = lookup("HUB_IPC_MAX_RETRIES") {
            match value.parse::<u32>() {
                Ok(retries) => {
                    self.queue.max_retries = retries;
                    info!("Max retries overridden by environment: {}", retries);
                }
                Err(_) => warn!("Ignoring invalid HUB_IPC_MAX_RETRIES {:?}", value),
            }
        }

        if let Some(value) = lookup("HUB_IPC_MAX_FRAME_SIZE") {
            match value.parse::<usize>() {
                Ok(size) => {
                    self.max_frame_size = size;
                    info!("Max frame size overridden by environment: {}", size);
                }
                Err(_) => warn!("Ignoring invalid HUB_IPC_MAX_FRAME_SIZE {:?}", value),
            }
        }

        if let Some(value) = lookup("HUB_IPC_REQUEUE_POLICY") {
            match value.parse::<RequeuePolicy>() {
                Ok(policy) => {
                    self.queue.requeue_policy = policy;
                    info!("Requeue policy overridden by environment: {:?}", policy);
                }
                Err(e) => warn!("Ignoring HUB_IPC_REQUEUE_POLICY: {}", e),
            }
        }
    }
}
