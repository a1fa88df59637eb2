//! Supervisor: owns every pipeline component and drives the read loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::classifier::Frame;
use crate::dedup::DedupState;
use crate::error::{Error, Result};
use crate::frame::FrameDecoder;
use crate::node_table::NodeTable;
use crate::packet_registry::{POWER_REPORT, TOPOLOGY_REPORT, packet_type_name};
use crate::packets::{decode_power_report, decode_topology_report};
use crate::publisher::{self, Publisher};
use crate::receive_response;
use crate::transport::{ReadOutcome, Transport};

/// Read chunk size; arbitrary but generous relative to one frame.
const READ_CHUNK: usize = 4096;

/// Owns the node table, dedup state, publisher handle and transport; the
/// sole thing that runs the decode pipeline end to end.
pub struct Supervisor<T: Transport, P: Publisher> {
    transport: T,
    publisher: P,
    prefix: String,
    node_table: NodeTable,
    dedup: DedupState,
    running: Arc<AtomicBool>,
}

impl<T: Transport, P: Publisher> Supervisor<T, P> {
    /// Build a supervisor. `running` is shared with a signal handler so an
    /// external Ctrl-C can stop the loop between frames.
    pub fn new(
        transport: T,
        publisher: P,
        prefix: String,
        node_table: NodeTable,
        dedup_window_seconds: f64,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            transport,
            publisher,
            prefix,
            node_table,
            dedup: DedupState::new(dedup_window_seconds),
            running,
        }
    }

    /// Run until `running` is cleared or the transport hits a fatal error.
    pub fn run(&mut self) -> Result<()> {
        let mut decoder = FrameDecoder::new();
        let result = loop {
            if !self.running.load(Ordering::SeqCst) {
                info!("shutdown requested, stopping read loop");
                break Ok(());
            }
            match self.transport.read(READ_CHUNK) {
                Ok(ReadOutcome::Data(bytes)) => {
                    let node_table = &mut self.node_table;
                    let dedup = &mut self.dedup;
                    let publisher = &self.publisher;
                    let prefix = &self.prefix;
                    decoder.feed(&bytes, |body| {
                        handle_frame(body, node_table, dedup, publisher, prefix);
                    });
                }
                Ok(ReadOutcome::Timeout) => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Ok(ReadOutcome::Eof) => {
                    warn!("transport closed");
                    break Err(Error::TransportClosed);
                }
                Err(e) => {
                    error!("fatal transport error: {e}");
                    break Err(Error::Transport(e));
                }
            }
        };
        self.publisher.disconnect();
        result
    }
}

fn handle_frame(
    body: &[u8],
    node_table: &mut NodeTable,
    dedup: &mut DedupState,
    publisher: &dyn Publisher,
    prefix: &str,
) {
    let Some(frame) = Frame::classify(body) else {
        return;
    };
    if !frame.is_receive_response() {
        return;
    }

    let gateway_id = frame.gateway_id;
    receive_response::parse(frame.payload, |packet_type, node_id, data| {
        match packet_type {
            POWER_REPORT => {
                let Some(report) = decode_power_report(data) else {
                    return;
                };
                if !dedup.should_publish(gateway_id, node_id, &report) {
                    debug!("suppressing duplicate report for node {node_id}");
                    return;
                }
                let addr = node_table.get(node_id);
                publisher::publish_power_report(
                    publisher, prefix, gateway_id, node_id, addr, &report,
                );
            }
            TOPOLOGY_REPORT => {
                let Some(addr) = decode_topology_report(data) else {
                    return;
                };
                info!("learned long address for node {node_id}: {addr:02x?}");
                node_table.update(node_id, addr);
            }
            other => {
                debug!(
                    "skipping packet type {other:#04x} ({})",
                    packet_type_name(other).unwrap_or("UNKNOWN")
                );
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct ScriptedTransport {
        chunks: Vec<Vec<u8>>,
    }

    impl Transport for ScriptedTransport {
        fn read(&mut self, _max: usize) -> std::io::Result<ReadOutcome> {
            if self.chunks.is_empty() {
                Ok(ReadOutcome::Eof)
            } else {
                Ok(ReadOutcome::Data(self.chunks.remove(0)))
            }
        }
    }

    #[derive(Default)]
    struct Recorder {
        topics: Mutex<Vec<String>>,
    }

    impl Publisher for Recorder {
        fn publish(&self, topic: &str, _payload: &[u8]) -> Result<()> {
            self.topics.lock().unwrap().push(topic.to_string());
            Ok(())
        }
    }

    fn wire_frame(body: &[u8]) -> Vec<u8> {
        let crc = crate::frame::crc16(body);
        let mut inner = body.to_vec();
        inner.extend(crc.to_le_bytes());
        let mut out = vec![0x7E, 0x07];
        for b in inner {
            match b {
                0x7E => out.extend([0x7E, 0x00]),
                other => out.push(other),
            }
        }
        out.extend([0x7E, 0x08]);
        out
    }

    fn power_report_frame(gateway_id: u16, node_id: u16, slot: u16) -> Vec<u8> {
        let mut data = vec![0x7D, 0x00, 0x00, 0xFF, 0x64, 0x00, 0x00, 0, 0, 0];
        data.extend(slot.to_be_bytes());
        data.push(0x7B);

        let mut payload = vec![0x00, 0xFF]; // status_type, most-minimal
        payload.extend([0u8; 3]); // slot counter
        payload.push(0x31); // POWER_REPORT
        payload.extend(node_id.to_be_bytes());
        payload.extend([0u8; 3]); // short addr + DSN
        payload.push(data.len() as u8);
        payload.extend(data);

        let mut body = vec![];
        body.extend((0x8000 | gateway_id).to_be_bytes());
        body.extend([0x01, 0x49]); // RECEIVE_RESPONSE
        body.extend(payload);
        wire_frame(&body)
    }

    #[test]
    fn end_to_end_power_report_reaches_publisher() {
        let dir = tempfile::tempdir().unwrap();
        let wire = power_report_frame(1, 42, 5);
        let transport = ScriptedTransport { chunks: vec![wire] };
        let publisher = Recorder::default();
        let node_table = NodeTable::load(dir.path().join("nodes.json"));
        let running = Arc::new(AtomicBool::new(true));

        let mut sup =
            Supervisor::new(transport, publisher, "tigo".into(), node_table, 5.0, running);
        let result = sup.run();
        assert!(matches!(result, Err(Error::TransportClosed)));
        assert_eq!(*sup.publisher.topics.lock().unwrap(), vec!["tigo/unknown-42"]);
    }

    #[test]
    fn shutdown_flag_stops_the_loop_without_error() {
        let dir = tempfile::tempdir().unwrap();
        struct Never;
        impl Transport for Never {
            fn read(&mut self, _max: usize) -> std::io::Result<ReadOutcome> {
                Ok(ReadOutcome::Timeout)
            }
        }
        let running = Arc::new(AtomicBool::new(false));
        let node_table = NodeTable::load(dir.path().join("nodes.json"));
        let mut sup =
            Supervisor::new(Never, Recorder::default(), "tigo".into(), node_table, 5.0, running);
        assert!(sup.run().is_ok());
    }
}
