//! Diagnostic-only opcode registries.
//!
//! Neither table drives parsing or dispatch: the receive-response parser
//! only special-cases `POWER_REPORT` and `TOPOLOGY_REPORT`
//! ([`crate::receive_response`]), and the classifier only special-cases
//! `RECEIVE_RESPONSE` ([`crate::classifier`]). Everything else is logged by
//! name here and then skipped.

/// A gateway envelope type: the 2-byte code at `body[2..4]` of a frame.
pub type EnvelopeType = [u8; 2];

/// `RECEIVE_RESPONSE` envelope type: the only one the core pipeline acts on.
pub const RECEIVE_RESPONSE: EnvelopeType = [0x01, 0x49];
/// `RECEIVE_REQUEST` envelope type.
pub const RECEIVE_REQUEST: EnvelopeType = [0x01, 0x48];

/// Look up a human-readable name for a known envelope type, for logging.
pub fn envelope_type_name(code: EnvelopeType) -> &'static str {
    match code {
        RECEIVE_REQUEST => "RECEIVE_REQUEST",
        RECEIVE_RESPONSE => "RECEIVE_RESPONSE",
        [0x0B, 0x0F] => "COMMAND_REQUEST",
        [0x0B, 0x10] => "COMMAND_RESPONSE",
        [0x0B, 0x00] => "PING_REQUEST",
        [0x0B, 0x01] => "PING_RESPONSE",
        [0x00, 0x14] => "ENUMERATION_START_REQ",
        [0x00, 0x15] => "ENUMERATION_START_RSP",
        [0x00, 0x38] => "ENUMERATION_REQ",
        [0x00, 0x39] => "ENUMERATION_RSP",
        [0x00, 0x3C] => "ASSIGN_GATEWAY_ID_REQ",
        [0x00, 0x3D] => "ASSIGN_GATEWAY_ID_RSP",
        [0x00, 0x3A] => "IDENTIFY_REQ",
        [0x00, 0x3B] => "IDENTIFY_RSP",
        [0x00, 0x0A] => "VERSION_REQ",
        [0x00, 0x0B] => "VERSION_RSP",
        [0x0E, 0x02] => "ENUMERATION_END_REQ",
        [0x00, 0x06] => "ENUMERATION_END_RSP",
        _ => "UNKNOWN",
    }
}

/// Embedded-packet opcode, carried in a `RECEIVE_RESPONSE` payload.
///
/// Only [`POWER_REPORT`] and [`TOPOLOGY_REPORT`] get decoded
/// ([`crate::receive_response`]); all others are parsed only far enough to
/// determine their length and are then skipped. This table exists purely
/// so the skip path can log *what* it skipped instead of a bare opcode.
pub const POWER_REPORT: u8 = 0x31;
/// Topology report opcode.
pub const TOPOLOGY_REPORT: u8 = 0x09;

/// Name a packet opcode for diagnostics. Unrecognized opcodes (including
/// ones this bridge intentionally never interprets) come back as `None`.
pub fn packet_type_name(opcode: u8) -> Option<&'static str> {
    Some(match opcode {
        0x06 => "STRING_REQUEST",
        0x07 => "STRING_RESPONSE",
        POWER_REPORT => "POWER_REPORT",
        TOPOLOGY_REPORT => "TOPOLOGY_REPORT",
        0x0D => "GATEWAY_RADIO_CONFIG_REQUEST",
        0x0E => "GATEWAY_RADIO_CONFIG_RESPONSE",
        0x13 => "PV_CONFIG_REQUEST",
        0x18 => "PV_CONFIG_RESPONSE",
        0x22 => "BROADCAST",
        0x23 => "BROADCAST_ACK",
        0x26 => "NODE_TABLE_REQUEST",
        0x27 => "NODE_TABLE_RESPONSE",
        0x2D => "LONG_NETWORK_STATUS_REQUEST",
        0x2E => "NETWORK_STATUS_REQUEST",
        0x2F => "NETWORK_STATUS_RESPONSE",
        _ => return None,
    })
}
