//! Serial-line transport.

use std::io::Read;
use std::time::Duration;

use log::info;

use super::{ReadOutcome, Transport};

/// Serial port transport, default 38400 baud, 8-N-1.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Open `device` at `baud_rate`, with a short read timeout so the
    /// supervisor's shutdown flag gets checked regularly.
    pub fn open(device: &str, baud_rate: u32) -> std::io::Result<Self> {
        let port = serialport::new(device, baud_rate)
            .timeout(Duration::from_secs(1))
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .open()
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        info!("Connected to serial port {device} at {baud_rate} baud");
        Ok(Self { port })
    }
}

impl Transport for SerialTransport {
    fn read(&mut self, max: usize) -> std::io::Result<ReadOutcome> {
        let mut buf = vec![0u8; max];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(ReadOutcome::Timeout),
            Ok(n) => {
                buf.truncate(n);
                Ok(ReadOutcome::Data(buf))
            }
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(ReadOutcome::Timeout),
            Err(e) => Err(e),
        }
    }
}
