//! Bitfields carried in node advertisements and readings.
//!
//! Both serialize as plain integers so JSON peers on the other processor see the same
//! numeric value that travels in the advertisement byte.

use bitflags::bitflags;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

bitflags! {
    /// Node fault bitfield (offset 14 of the advertisement). Bits are independent.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultFlags: u8 {
        /// Reading above the configured high limit
        const SENSOR_HIGH = 0x01;
        /// Reading below the configured low limit
        const SENSOR_LOW = 0x02;
        /// Probe disconnected
        const SENSOR_DISCONNECTED = 0x04;
        /// ADC input saturated
        const ADC_SATURATION = 0x08;
        /// Battery below threshold
        const LOW_BATTERY = 0x10;
        /// Last boot was caused by the watchdog
        const WATCHDOG_RESET = 0x20;
        /// Stored configuration failed validation
        const CONFIG_CORRUPT = 0x40;
        /// Reserved for future use
        const RESERVED = 0x80;
    }
}

bitflags! {
    /// Reading quality bitfield
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QualityFlags: u8 {
        /// Reading is valid
        const VALID = 0x01;
        /// Calibration applied
        const CALIBRATED = 0x02;
        /// Within the sensor's rated range
        const IN_RANGE = 0x04;
        /// Signal settled before sampling
        const STABLE = 0x08;
    }
}

impl FaultFlags {
    /// Lowercase names of the set bits, as used in telemetry fault lists
    pub fn names(&self) -> Vec<String> {
        self.iter_names()
            .map(|(name, _)| name.to_ascii_lowercase())
            .collect()
    }

    /// Rebuild a bitfield from fault names; unknown names are ignored
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        names
            .into_iter()
            .filter_map(|name| Self::from_name(&name.as_ref().to_ascii_uppercase()))
            .fold(Self::empty(), |acc, flag| acc | flag)
    }
}

macro_rules! impl_numeric_serde {
    ($flags:ty) => {
        impl Serialize for $flags {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_u8(self.bits())
            }
        }

        impl<'de> Deserialize<'de> for $flags {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                u8::deserialize(deserializer).map(Self::from_bits_retain)
            }
        }
    };
}

impl_numeric_serde!(FaultFlags);
impl_numeric_serde!(QualityFlags);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_are_independent() {
        let flags = FaultFlags::SENSOR_HIGH | FaultFlags::LOW_BATTERY | FaultFlags::WATCHDOG_RESET;
        assert_eq!(flags.bits(), 0x31);
        assert!(flags.contains(FaultFlags::LOW_BATTERY));
        assert!(!flags.contains(FaultFlags::SENSOR_LOW));
    }

    #[test]
    fn test_names_roundtrip() {
        let flags = FaultFlags::SENSOR_DISCONNECTED | FaultFlags::CONFIG_CORRUPT;
        let names = flags.names();
        assert_eq!(names, vec!["sensor_disconnected", "config_corrupt"]);
        assert_eq!(FaultFlags::from_names(&names), flags);
        assert_eq!(FaultFlags::from_names(["bogus"]), FaultFlags::empty());
    }

    #[test]
    fn test_serializes_as_number() {
        let json = serde_json::to_string(&(FaultFlags::ADC_SATURATION | FaultFlags::RESERVED)).unwrap();
        assert_eq!(json, "136");
        let back: FaultFlags = serde_json::from_str("136").unwrap();
        assert_eq!(back.bits(), 0x88);
        let quality: QualityFlags = serde_json::from_str("5").unwrap();
        assert_eq!(quality, QualityFlags::VALID | QualityFlags::IN_RANGE);
    }
}
