//! BLE GATT identifiers and command codes shared by nodes, hubs and the local web app.
//!
//! The IPC core only carries these through; GATT I/O happens in the radio firmware.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bluetooth base UUID suffix shared by all short-form identifiers
pub const BASE_UUID_SUFFIX: &str = "-0000-1000-8000-00805f9b34fb";

/// Expand a 16-bit short-form identifier into a full 128-bit UUID string
pub fn short_uuid(short: u16) -> String {
    format!("0000{:04x}{}", short, BASE_UUID_SUFFIX)
}

/// Standard Bluetooth SIG services
pub mod standard {
    /// Device Information service
    pub const DEVICE_INFORMATION: &str = "0000180a-0000-1000-8000-00805f9b34fb";
    /// Battery service
    pub const BATTERY_SERVICE: &str = "0000180f-0000-1000-8000-00805f9b34fb";

    /// Manufacturer name string
    pub const MANUFACTURER_NAME: &str = "00002a29-0000-1000-8000-00805f9b34fb";
    /// Model number string
    pub const MODEL_NUMBER: &str = "00002a24-0000-1000-8000-00805f9b34fb";
    /// Serial number string
    pub const SERIAL_NUMBER: &str = "00002a25-0000-1000-8000-00805f9b34fb";
    /// Hardware revision string
    pub const HARDWARE_REVISION: &str = "00002a27-0000-1000-8000-00805f9b34fb";
    /// Firmware revision string
    pub const FIRMWARE_REVISION: &str = "00002a26-0000-1000-8000-00805f9b34fb";
    /// Software revision string
    pub const SOFTWARE_REVISION: &str = "00002a28-0000-1000-8000-00805f9b34fb";
    /// Battery level
    pub const BATTERY_LEVEL: &str = "00002a19-0000-1000-8000-00805f9b34fb";
}

/// Industrial sensor service exposed by every node
pub mod sensor {
    /// Service UUID
    pub const SERVICE: &str = "00001000-0000-1000-8000-00805f9b34fb";
    /// Latest reading (read, notify)
    pub const READING: &str = "00001001-0000-1000-8000-00805f9b34fb";
    /// Configuration (read, authenticated write)
    pub const CONFIG: &str = "00001002-0000-1000-8000-00805f9b34fb";
    /// Calibration parameters (read, authenticated write)
    pub const CALIBRATION: &str = "00001003-0000-1000-8000-00805f9b34fb";
    /// Hub binding (read, authenticated write)
    pub const BINDING: &str = "00001004-0000-1000-8000-00805f9b34fb";
    /// Diagnostics (read, notify)
    pub const DIAGNOSTICS: &str = "00001005-0000-1000-8000-00805f9b34fb";
    /// Chunked log export (read)
    pub const LOG_EXPORT: &str = "00001006-0000-1000-8000-00805f9b34fb";
    /// Command/control (write)
    pub const COMMAND: &str = "00001007-0000-1000-8000-00805f9b34fb";
}

/// Local management service exposed by the hub
pub mod hub {
    /// Service UUID
    pub const SERVICE: &str = "00002000-0000-1000-8000-00805f9b34fb";
    /// Hub status (read, notify)
    pub const STATUS: &str = "00002001-0000-1000-8000-00805f9b34fb";
    /// Known nodes list (read)
    pub const NODES: &str = "00002002-0000-1000-8000-00805f9b34fb";
    /// Scan control (write)
    pub const SCAN_CONTROL: &str = "00002003-0000-1000-8000-00805f9b34fb";
    /// Commissioning assist (read, write)
    pub const COMMISSIONING: &str = "00002004-0000-1000-8000-00805f9b34fb";
    /// Hub configuration (read, authenticated write)
    pub const HUB_CONFIG: &str = "00002005-0000-1000-8000-00805f9b34fb";
}

/// Firmware update service
pub mod firmware {
    /// Service UUID
    pub const SERVICE: &str = "00003000-0000-1000-8000-00805f9b34fb";
    /// Control point
    pub const CONTROL_POINT: &str = "00003001-0000-1000-8000-00805f9b34fb";
    /// Image data transfer
    pub const DATA: &str = "00003002-0000-1000-8000-00805f9b34fb";
    /// Transfer status and progress
    pub const STATUS: &str = "00003003-0000-1000-8000-00805f9b34fb";
}

/// Commands written to a node's command characteristic
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeCommand {
    /// Enter commissioning mode
    EnterCommissioning = 0x01,
    /// Leave commissioning mode
    ExitCommissioning = 0x02,
    /// Enter maintenance mode
    EnterMaintenance = 0x03,
    /// Leave maintenance mode
    ExitMaintenance = 0x04,
    /// Take a sample immediately
    TriggerSample = 0x05,
    /// Clear latched faults
    ClearFaults = 0x06,
    /// Erase configuration and binding
    FactoryReset = 0x07,
    /// Reboot the node
    Reboot = 0x08,
}

impl TryFrom<u8> for NodeCommand {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(NodeCommand::EnterCommissioning),
            0x02 => Ok(NodeCommand::ExitCommissioning),
            0x03 => Ok(NodeCommand::EnterMaintenance),
            0x04 => Ok(NodeCommand::ExitMaintenance),
            0x05 => Ok(NodeCommand::TriggerSample),
            0x06 => Ok(NodeCommand::ClearFaults),
            0x07 => Ok(NodeCommand::FactoryReset),
            0x08 => Ok(NodeCommand::Reboot),
            _ => Err(value),
        }
    }
}

/// Commands written to the hub's scan control characteristic
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubScanCommand {
    /// Start scanning for advertisements
    StartScan = 0x01,
    /// Stop scanning
    StopScan = 0x02,
    /// Rebuild the known nodes list
    RefreshNodes = 0x03,
}

impl TryFrom<u8> for HubScanCommand {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x01 => Ok(HubScanCommand::StartScan),
            0x02 => Ok(HubScanCommand::StopScan),
            0x03 => Ok(HubScanCommand::RefreshNodes),
            _ => Err(value),
        }
    }
}

/// Node lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Fresh from the factory
    Factory,
    /// Provisioned but not bound to a hub
    Uncommissioned,
    /// Commissioning in progress
    Commissioning,
    /// Normal sampling and advertising
    Operational,
    /// Maintenance mode
    Maintenance,
    /// Latched fault
    Fault,
}

impl NodeState {
    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Factory => "factory",
            NodeState::Uncommissioned => "uncommissioned",
            NodeState::Commissioning => "commissioning",
            NodeState::Operational => "operational",
            NodeState::Maintenance => "maintenance",
            NodeState::Fault => "fault",
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
