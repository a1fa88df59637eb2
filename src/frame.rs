//! Byte-stuffed, CRC-protected frame decoder.
//!
//! Frames on the wire look like `7E 07 <escaped body + CRC> 7E 08`. The
//! decoder is fed arbitrarily fragmented byte chunks and emits whole,
//! unescaped, CRC-validated frame bodies (CRC already stripped) to a sink.
//!
//! Unescaping is deferred until the end sentinel is seen, so an escape
//! sequence split across two `feed()` calls is handled correctly: the raw,
//! still-escaped bytes just sit in the buffer until the end sentinel shows
//! up.

use log::{trace, warn};

const START: [u8; 2] = [0x7E, 0x07];
const END: [u8; 2] = [0x7E, 0x08];

/// Upper bound on the internal buffer. On overrun the decoder resets and
/// resyncs on the next start sentinel.
const MAX_BUFFER: usize = 1 << 20;

fn escaped_byte(b: u8) -> Option<u8> {
    Some(match b {
        0x00 => 0x7E,
        0x01 => 0x24,
        0x02 => 0x23,
        0x03 => 0x25,
        0x04 => 0xA4,
        0x05 => 0xA3,
        0x06 => 0xA5,
        _ => return None,
    })
}

fn escape_code(b: u8) -> Option<u8> {
    Some(match b {
        0x7E => 0x00,
        0x24 => 0x01,
        0x23 => 0x02,
        0x25 => 0x03,
        0xA4 => 0x04,
        0xA3 => 0x05,
        0xA5 => 0x06,
        _ => return None,
    })
}

/// Escape `body` the way the gateway would before sending it. Only used by
/// tests, to check that escaping and unescaping round-trip.
#[cfg(test)]
fn escape(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    for &b in body {
        match escape_code(b) {
            Some(code) => {
                out.push(0x7E);
                out.push(code);
            }
            None => out.push(b),
        }
    }
    out
}

/// Unescape the raw inter-sentinel bytes. Returns `None` if a lone `0x7E`
/// is found that isn't a recognized escape pair -- a protocol violation
/// per the wire format.
fn unescape(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] == 0x7E {
            if i + 1 >= data.len() {
                return None;
            }
            out.push(escaped_byte(data[i + 1])?);
            i += 2;
        } else {
            out.push(data[i]);
            i += 1;
        }
    }
    Some(out)
}

/// Reflected CRC-16, polynomial and initial register both `0x8408`.
///
/// This is *not* the textbook CRC-16/CCITT (which initializes to
/// `0xFFFF`); the gateway's variant must be preserved exactly.
pub fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0x8408;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0x8408
            } else {
                crc >> 1
            };
        }
    }
    crc
}

fn find(haystack: &[u8], needle: [u8; 2]) -> Option<usize> {
    haystack.windows(2).position(|w| w == needle)
}

/// Byte-stuffed frame decoder. Stateful across `feed()` calls.
#[derive(Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    /// Create a fresh decoder with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, invoking `on_frame` for every complete,
    /// CRC-valid frame body found (CRC already stripped).
    pub fn feed(&mut self, bytes: &[u8], mut on_frame: impl FnMut(&[u8])) {
        self.buf.extend_from_slice(bytes);
        if self.buf.len() > MAX_BUFFER {
            warn!(
                "frame decoder buffer overrun ({} bytes), resyncing",
                self.buf.len()
            );
            self.buf.clear();
            return;
        }

        loop {
            let Some(start) = find(&self.buf, START) else {
                return;
            };
            let Some(end_rel) = find(&self.buf[start + 2..], END) else {
                if start > 0 {
                    self.buf.drain(..start);
                }
                return;
            };
            let end = start + 2 + end_rel;
            let consumed = end + 2;

            match unescape(&self.buf[start + 2..end]) {
                Some(unescaped) => {
                    self.buf.drain(..consumed);
                    Self::dispatch(&unescaped, &mut on_frame);
                }
                None => {
                    warn!("lone escape byte in frame, resyncing");
                    // Resync past the violating start sentinel, not the
                    // whole candidate: a valid start may be hiding inside
                    // what we thought was the body.
                    self.buf.drain(..start + 2);
                }
            }
        }
    }

    fn dispatch(unescaped: &[u8], on_frame: &mut impl FnMut(&[u8])) {
        if unescaped.len() < 2 {
            trace!("frame too short to hold a CRC, dropping");
            return;
        }
        let body_len = unescaped.len() - 2;
        let body = &unescaped[..body_len];
        let stored = u16::from_le_bytes([unescaped[body_len], unescaped[body_len + 1]]);
        let computed = crc16(body);
        if computed != stored {
            warn!("CRC mismatch: computed {computed:04x}, stored {stored:04x}, dropping frame");
            return;
        }
        if body.len() < 4 {
            trace!("frame body too short ({} bytes), dropping silently", body.len());
            return;
        }
        on_frame(body);
    }
}
