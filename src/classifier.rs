//! Frame classifier.
//!
//! Pulls the address, direction, and envelope type out of a decoded frame
//! body and decides whether the core pipeline cares about it at all.

use log::trace;

use crate::packet_registry::{RECEIVE_RESPONSE, envelope_type_name};

/// A classified frame, borrowing its payload from the decoder's buffer.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    /// Full 16-bit address field, as seen on the wire.
    pub address: u16,
    /// High bit of `address`: true if this frame came from the gateway.
    pub from_gateway: bool,
    /// Low 15 bits of `address`.
    pub gateway_id: u16,
    /// 2-byte envelope type code.
    pub envelope_type: [u8; 2],
    /// Bytes after the envelope type; may be empty.
    pub payload: &'a [u8],
}

impl<'a> Frame<'a> {
    /// Classify a decoded frame body. Returns `None` if the body is too
    /// short to hold an address and envelope type (the frame decoder
    /// already filters these out, but this stays defensive).
    pub fn classify(body: &'a [u8]) -> Option<Self> {
        if body.len() < 4 {
            return None;
        }
        let address = u16::from_be_bytes([body[0], body[1]]);
        let envelope_type = [body[2], body[3]];
        trace!(
            "frame address={address:04x} envelope={}",
            envelope_type_name(envelope_type)
        );
        Some(Self {
            address,
            from_gateway: address & 0x8000 != 0,
            gateway_id: address & 0x7FFF,
            envelope_type,
            payload: &body[4..],
        })
    }

    /// Whether the core pipeline should walk this frame's payload as a
    /// `RECEIVE_RESPONSE`.
    pub fn is_receive_response(&self) -> bool {
        self.from_gateway && self.envelope_type == RECEIVE_RESPONSE
    }
}
