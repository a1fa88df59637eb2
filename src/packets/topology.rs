//! Topology report decoding: learns a node's stable long address.

use log::trace;

/// An 8-byte stable radio address, as carried by a `TOPOLOGY_REPORT`.
pub type LongAddress = [u8; 8];

/// Decode a topology report's `data` bytes into a long address. Returns
/// `None` (silently, per the wire spec) if `data` is too short.
pub(crate) fn decode_topology_report(data: &[u8]) -> Option<LongAddress> {
    if data.len() < 16 {
        trace!("topology report data too short ({} bytes, need 16), dropping", data.len());
        return None;
    }
    let mut addr = [0u8; 8];
    addr.copy_from_slice(&data[8..16]);
    Some(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_bytes_8_through_16() {
        let mut data = [0u8; 16];
        let addr = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11];
        data[8..16].copy_from_slice(&addr);
        assert_eq!(decode_topology_report(&data), Some(addr));
    }

    #[test]
    fn fifteen_bytes_is_rejected() {
        let data = [0u8; 15];
        assert_eq!(decode_topology_report(&data), None);
    }
}
