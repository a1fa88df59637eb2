//! TCP (serial-over-TCP) transport.

use std::io::Read;
use std::net::TcpStream;
use std::time::Duration;

use log::info;

use super::{ReadOutcome, Transport};

/// TCP transport, for gateways exposed via a serial-over-TCP tunnel.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// Connect to `host:port`.
    pub fn connect(host: &str, port: u16) -> std::io::Result<Self> {
        let stream = TcpStream::connect((host, port))?;
        stream.set_read_timeout(Some(Duration::from_secs(1)))?;
        info!("Connected to TCP {host}:{port}");
        Ok(Self { stream })
    }
}

impl Transport for TcpTransport {
    fn read(&mut self, max: usize) -> std::io::Result<ReadOutcome> {
        let mut buf = vec![0u8; max];
        match self.stream.read(&mut buf) {
            Ok(0) => Ok(ReadOutcome::Eof),
            Ok(n) => {
                buf.truncate(n);
                Ok(ReadOutcome::Data(buf))
            }
            Err(e)
                if e.kind() == std::io::ErrorKind::TimedOut
                    || e.kind() == std::io::ErrorKind::WouldBlock =>
            {
                Ok(ReadOutcome::Timeout)
            }
            Err(e) => Err(e),
        }
    }
}
