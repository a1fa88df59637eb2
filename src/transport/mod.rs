//! Opaque blocking byte transport.
//!
//! The supervisor only ever calls [`Transport::read`]; it doesn't care
//! whether bytes come from a serial line or a TCP tunnel.

mod serial;
mod tcp;

pub use serial::SerialTransport;
pub use tcp::TcpTransport;

/// Outcome of a single blocking read.
pub enum ReadOutcome {
    /// Bytes were read.
    Data(Vec<u8>),
    /// No bytes arrived before the transport's read timeout elapsed.
    Timeout,
    /// The transport reported end-of-stream; it will never produce more
    /// data.
    Eof,
}

/// A blocking byte source.
///
/// Implementations must honor a short read timeout (on the order of a
/// second) so the supervisor's shutdown flag is checked regularly even
/// when the gateway is silent.
pub trait Transport {
    /// Read at most `max` bytes, blocking until data arrives, the read
    /// times out, or the transport is closed.
    fn read(&mut self, max: usize) -> std::io::Result<ReadOutcome>;
}
