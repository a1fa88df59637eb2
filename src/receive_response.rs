//! Receive-response payload parser.
//!
//! A `RECEIVE_RESPONSE` frame's payload is a status preamble followed by
//! zero or more embedded radio packets. This walks that payload and hands
//! each embedded packet to a callback; it never allocates and never holds
//! onto its input past the call.

use log::{trace, warn};

/// Extra bytes to skip after the 2-byte `status_type`, keyed by the type
/// itself. An unrecognized `status_type` aborts the parse.
fn status_extra_skip(status_type: [u8; 2]) -> Option<usize> {
    Some(match status_type {
        [0x00, 0xE0] => 7, // full status
        [0x00, 0xFE] => 1, // minimal + Rx buffers
        [0x00, 0xEE] => 2, // includes packet-high
        [0x00, 0xFF] => 0, // most-minimal
        _ => return None,
    })
}

/// Walk `payload` (a `RECEIVE_RESPONSE` frame's payload) and invoke
/// `on_packet(packet_type, node_id, data)` for every embedded packet found.
///
/// Returns silently (after logging) on any of the abort conditions in the
/// wire format: too-short payload, unrecognized `status_type`, or a
/// truncated trailing packet. None of these are errors from the caller's
/// perspective -- the next frame is unaffected.
pub fn parse(payload: &[u8], mut on_packet: impl FnMut(u8, u16, &[u8])) {
    if payload.len() < 3 {
        trace!("receive-response payload too short ({} bytes)", payload.len());
        return;
    }

    let status_type = [payload[0], payload[1]];
    let Some(extra) = status_extra_skip(status_type) else {
        warn!("unrecognized receive-response status_type {status_type:02x?}, aborting parse");
        return;
    };

    // 2 bytes of status_type + the type-dependent extra skip + 3 bytes of
    // slot counter, unconditionally (observed gateway behavior; see the
    // design notes on this one's ambiguity).
    let mut offset = 2usize + extra + 3;
    if offset > payload.len() {
        trace!("receive-response payload shorter than status preamble, no packets");
        return;
    }

    while payload.len() - offset >= 7 {
        let packet_type = payload[offset];
        let node_id = u16::from_be_bytes([payload[offset + 1], payload[offset + 2]]);
        // offset+3..offset+6 is short-address + DSN, skipped unread.
        let data_length = payload[offset + 6] as usize;
        let data_start = offset + 7;

        if data_start + data_length > payload.len() {
            trace!(
                "truncated embedded packet (type {packet_type:#04x}, wanted {data_length} bytes, \
                 have {})",
                payload.len().saturating_sub(data_start)
            );
            return;
        }

        let data = &payload[data_start..data_start + data_length];
        on_packet(packet_type, node_id, data);
        offset = data_start + data_length;
    }
}
