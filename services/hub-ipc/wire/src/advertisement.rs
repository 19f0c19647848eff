//! Node advertisement packing.
//!
//! Nodes broadcast a 17-byte manufacturer-specific payload summarizing their latest
//! sample. All multi-byte fields are little-endian.
//!
//! ```text
//! offset 0   u16  company id
//! offset 2   u8   advertisement version
//! offset 3   [6]  node hardware address
//! offset 9   u8   battery percent
//! offset 10  f32  last reading
//! offset 14  u8   fault flags
//! offset 15  u16  freshness counter
//! ```

use crate::flags::FaultFlags;
use crate::WireError;
use bytes::{Buf, BufMut};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Encoded advertisement size in bytes
pub const ADVERTISEMENT_SIZE: usize = 17;

/// Current advertisement layout version
pub const ADVERTISEMENT_VERSION: u8 = 1;

/// Nordic Semiconductor company identifier
pub const NORDIC_COMPANY_ID: u16 = 0x0059;

/// 6-byte node hardware address, displayed as lowercase colon-separated hex
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct NodeAddress([u8; 6]);

impl NodeAddress {
    /// Create an address from raw bytes
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Raw address bytes
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

impl FromStr for NodeAddress {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');

        for byte in bytes.iter_mut() {
            let part = parts
                .next()
                .filter(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| WireError::Address(s.to_string()))?;
            *byte = u8::from_str_radix(part, 16).map_err(|_| WireError::Address(s.to_string()))?;
        }

        if parts.next().is_some() {
            return Err(WireError::Address(s.to_string()));
        }

        Ok(Self(bytes))
    }
}

impl Serialize for NodeAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NodeAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Decoded node advertisement
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAdvertisement {
    /// Bluetooth SIG company identifier
    pub company_id: u16,
    /// Advertisement layout version
    pub version: u8,
    /// Node hardware address
    pub node_id: NodeAddress,
    /// Battery estimate, 0-100
    pub battery_percent: u8,
    /// Most recent reading in engineering units
    pub last_reading: f32,
    /// Active faults
    pub fault_flags: FaultFlags,
    /// Sample counter, wraps at 65536
    pub counter: u16,
    /// Signal strength measured by the receiver; never on the wire
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rssi: Option<i16>,
}

impl NodeAdvertisement {
    /// Create an advertisement with the current layout version and Nordic company id
    pub fn new(node_id: NodeAddress, battery_percent: u8, last_reading: f32) -> Self {
        Self {
            company_id: NORDIC_COMPANY_ID,
            version: ADVERTISEMENT_VERSION,
            node_id,
            battery_percent,
            last_reading,
            fault_flags: FaultFlags::empty(),
            counter: 0,
            rssi: None,
        }
    }

    /// Attach the receiver-measured signal strength
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// Advance the freshness counter for the next sample, wrapping at 65536
    pub fn next_counter(&mut self) -> u16 {
        self.counter = self.counter.wrapping_add(1);
        self.counter
    }

    /// Pack into the 17-byte advertisement payload
    pub fn encode(&self) -> [u8; ADVERTISEMENT_SIZE] {
        let mut out = [0u8; ADVERTISEMENT_SIZE];
        let mut buf = &mut out[..];

        buf.put_u16_le(self.company_id);
        buf.put_u8(self.version);
        buf.put_slice(self.node_id.as_bytes());
        buf.put_u8(self.battery_percent);
        buf.put_f32_le(self.last_reading);
        buf.put_u8(self.fault_flags.bits());
        buf.put_u16_le(self.counter);

        out
    }

    /// Unpack an advertisement payload.
    ///
    /// Returns `None` for anything shorter than [`ADVERTISEMENT_SIZE`]; such an
    /// advertisement must be discarded, not read as zeroes.
    pub fn decode(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < ADVERTISEMENT_SIZE {
            return None;
        }

        let mut buf = &bytes[..ADVERTISEMENT_SIZE];
        let company_id = buf.get_u16_le();
        let version = buf.get_u8();
        let mut address = [0u8; 6];
        buf.copy_to_slice(&mut address);

        Some(Self {
            company_id,
            version,
            node_id: NodeAddress(address),
            battery_percent: buf.get_u8(),
            last_reading: buf.get_f32_le(),
            fault_flags: FaultFlags::from_bits_retain(buf.get_u8()),
            counter: buf.get_u16_le(),
            rssi: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> NodeAdvertisement {
        NodeAdvertisement {
            company_id: 0x0059,
            version: 1,
            node_id: "aa:bb:cc:dd:ee:ff".parse().unwrap(),
            battery_percent: 85,
            last_reading: 45.2,
            fault_flags: FaultFlags::empty(),
            counter: 7,
            rssi: None,
        }
    }

    #[test]
    fn test_encode_layout() {
        let bytes = sample().encode();
        assert_eq!(&bytes[0..2], &[0x59, 0x00]);
        assert_eq!(bytes[2], 1);
        assert_eq!(&bytes[3..9], &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!(bytes[9], 85);
        assert_eq!(&bytes[10..14], &45.2f32.to_le_bytes());
        assert_eq!(bytes[14], 0);
        assert_eq!(&bytes[15..17], &[7, 0]);
    }

    #[test]
    fn test_roundtrip() {
        let adv = sample();
        let decoded = NodeAdvertisement::decode(&adv.encode()).unwrap();
        assert_eq!(decoded, adv);
        assert_eq!(decoded.node_id.to_string(), "aa:bb:cc:dd:ee:ff");
        assert!((decoded.last_reading - 45.2).abs() < f32::EPSILON);
        assert!(!decoded.fault_flags.contains(FaultFlags::LOW_BATTERY));
    }

    #[test]
    fn test_roundtrip_with_faults_and_wrapped_counter() {
        let mut adv = sample();
        adv.fault_flags = FaultFlags::LOW_BATTERY | FaultFlags::SENSOR_HIGH | FaultFlags::RESERVED;
        adv.counter = u16::MAX;
        assert_eq!(adv.next_counter(), 0);

        let decoded = NodeAdvertisement::decode(&adv.encode()).unwrap();
        assert_eq!(decoded.fault_flags, adv.fault_flags);
        assert_eq!(decoded.counter, 0);
    }

    #[test]
    fn test_short_buffer_rejected() {
        let bytes = sample().encode();
        for len in 0..ADVERTISEMENT_SIZE {
            assert!(NodeAdvertisement::decode(&bytes[..len]).is_none());
        }
    }

    #[test]
    fn test_rssi_not_on_wire() {
        let adv = sample().with_rssi(-67);
        let decoded = NodeAdvertisement::decode(&adv.encode()).unwrap();
        assert_eq!(decoded.rssi, None);
        assert_eq!(decoded.with_rssi(-67), adv);
    }

    #[test]
    fn test_address_parsing() {
        let addr: NodeAddress = "AA:0b:Cc:00:Ee:01".parse().unwrap();
        assert_eq!(addr.to_string(), "aa:0b:cc:00:ee:01");

        for bad in ["", "aa:bb:cc:dd:ee", "aa:bb:cc:dd:ee:ff:00", "aa:bb:cc:dd:ee:gg", "a:bb:cc:dd:ee:ff", "+a:bb:cc:dd:ee:ff"] {
            assert!(bad.parse::<NodeAddress>().is_err(), "{:?}", bad);
        }
    }

    #[test]
    fn test_json_shape() {
        let json = serde_json::to_value(sample().with_rssi(-70)).unwrap();
        assert_eq!(json["nodeId"], "aa:bb:cc:dd:ee:ff");
        assert_eq!(json["batteryPercent"], 85);
        assert_eq!(json["faultFlags"], 0);
        assert_eq!(json["rssi"], -70);
    }
}
