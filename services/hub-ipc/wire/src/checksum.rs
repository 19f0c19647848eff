//! Frame integrity checksum.
//!
//! The link uses the reflected CRC-32 (ISO-HDLC: polynomial `0xEDB88320`, init and final
//! XOR `0xFFFFFFFF`) so that both radio processors agree bit for bit.

/// Compute the CRC-32 of `bytes`.
pub fn checksum(bytes: &[u8]) -> u32 {
    crc32fast::hash(bytes)
}

/// Recompute the checksum of `bytes` and compare it with `expected`.
pub fn verify(bytes: &[u8], expected: u32) -> bool {
    checksum(bytes) == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_value() {
        assert_eq!(checksum(b"123456789"), 0xCBF4_3926);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(checksum(&[]), 0);
    }

    #[test]
    fn test_verify() {
        let data = br#"{"type":"heartbeat"}"#;
        let crc = checksum(data);
        assert!(verify(data, crc));
        assert!(!verify(data, crc ^ 1));
    }
}
