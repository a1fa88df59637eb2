//! Publish/subscribe adapter.
//!
//! Wraps [`rumqttc`]'s synchronous client/connection pair behind the
//! narrow `publish(topic, payload)` contract the pipeline actually needs.
//! The connection's event loop runs on its own background thread; the
//! pipeline never blocks on network I/O to publish.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use log::{error, info, warn};
use rumqttc::{Client, Event, MqttOptions, Packet, QoS};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::packets::{LongAddress, PowerReport};

/// Everything needed to connect to the broker.
pub struct MqttSettings {
    /// Broker hostname.
    pub server: String,
    /// Broker port.
    pub port: u16,
    /// Username, if the broker requires authentication.
    pub username: Option<String>,
    /// Password, if the broker requires authentication.
    pub password: Option<String>,
    /// Topic prefix for published reports.
    pub prefix: String,
}

/// Narrow publish contract the pipeline depends on. A trait so tests can
/// swap in an in-memory recorder instead of a real broker.
pub trait Publisher {
    /// Publish `payload` to `topic`. Errors are the caller's to log and
    /// drop -- they must never propagate into the decode pipeline.
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()>;

    /// Disconnect cleanly. Called once by the supervisor during shutdown.
    /// A no-op by default, for test doubles that have nothing to close.
    fn disconnect(&self) {}
}

/// Real MQTT-backed publisher.
pub struct MqttPublisher {
    client: Client,
    prefix: String,
    /// Set just before an intentional `disconnect()`, so the event-loop
    /// thread can tell a requested shutdown apart from the broker dropping
    /// the connection on us.
    shutting_down: Arc<AtomicBool>,
    _event_loop: JoinHandle<()>,
}

const CONNECT_RETRIES: u32 = 5;
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(5);

impl MqttPublisher {
    /// Connect to the broker, retrying up to [`CONNECT_RETRIES`] times at
    /// [`CONNECT_RETRY_INTERVAL`] apart. Gives up with a fatal error if
    /// none succeed, per the startup-reconnect contract.
    pub fn connect(settings: MqttSettings) -> Result<Self> {
        let client_id = format!("tigo-bridge-{}", std::process::id());
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut opts = MqttOptions::new(&client_id, &settings.server, settings.port);
            opts.set_keep_alive(Duration::from_secs(30));
            if let (Some(user), Some(pass)) = (&settings.username, &settings.password) {
                opts.set_credentials(user, pass);
            }
            let (client, mut connection) = Client::new(opts, 64);

            match wait_for_connack(&mut connection) {
                Ok(()) => {
                    info!("connected to MQTT broker at {}:{}", settings.server, settings.port);
                    let shutting_down = Arc::new(AtomicBool::new(false));
                    let event_loop_shutdown = shutting_down.clone();
                    let event_loop = std::thread::spawn(move || {
                        for notification in connection.iter() {
                            if let Err(e) = notification {
                                if event_loop_shutdown.load(Ordering::SeqCst) {
                                    info!("MQTT connection closed after requested disconnect: {e}");
                                } else {
                                    warn!("MQTT event loop error: {e}");
                                }
                            }
                        }
                        if event_loop_shutdown.load(Ordering::SeqCst) {
                            info!("MQTT event loop stopped (clean disconnect)");
                        } else {
                            warn!("MQTT event loop stopped unexpectedly");
                        }
                    });
                    return Ok(Self {
                        client,
                        prefix: settings.prefix,
                        shutting_down,
                        _event_loop: event_loop,
                    });
                }
                Err(e) => {
                    if attempt >= CONNECT_RETRIES {
                        return Err(Error::PublisherConnect(format!(
                            "giving up after {attempt} attempts: {e}"
                        )));
                    }
                    warn!(
                        "MQTT connect attempt {attempt}/{CONNECT_RETRIES} failed: {e}, retrying in {:?}",
                        CONNECT_RETRY_INTERVAL
                    );
                    std::thread::sleep(CONNECT_RETRY_INTERVAL);
                }
            }
        }
    }
}

fn wait_for_connack(connection: &mut rumqttc::Connection) -> std::result::Result<(), String> {
    let deadline = Instant::now() + Duration::from_secs(10);
    for notification in connection.iter() {
        if Instant::now() > deadline {
            return Err("timed out waiting for CONNACK".into());
        }
        match notification {
            Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
            Ok(_) => continue,
            Err(e) => return Err(e.to_string()),
        }
    }
    Err("connection closed before CONNACK".into())
}

impl Publisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
        self.client
            .publish(topic, QoS::AtMostOnce, true, payload)
            .map_err(|e| Error::Publish(e.to_string()))
    }

    fn disconnect(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);
        info!("disconnecting from MQTT broker");
        if let Err(e) = self.client.disconnect() {
            warn!("error disconnecting MQTT client: {e}");
        }
    }
}

/// The JSON record emitted for one power report. Field names and rounding
/// mirror the source's published payload shape.
#[derive(Serialize)]
struct Record {
    #[serde(rename = "NodeID")]
    node_id: u16,
    #[serde(rename = "VIN")]
    vin: f64,
    #[serde(rename = "VOUT")]
    vout: f64,
    #[serde(rename = "DUTY")]
    duty: f64,
    #[serde(rename = "AMPSIN")]
    ampsin: f64,
    #[serde(rename = "TEMP")]
    temp: f64,
    #[serde(rename = "RSSI")]
    rssi: Option<u8>,
    #[serde(rename = "SLOT")]
    slot: u16,
    #[serde(rename = "POWER")]
    power: f64,
    #[serde(rename = "Address")]
    address: String,
    #[serde(rename = "GatewayID")]
    gateway_id: u16,
    #[serde(rename = "Timestamp")]
    timestamp: f64,
}

fn round(v: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (v * factor).round() / factor
}

/// Compose the topic for a node: colon-separated lowercase hex of its long
/// address, or `unknown-{node_id}` if no topology report has named it yet.
pub fn topic_for(prefix: &str, node_id: u16, addr: Option<&LongAddress>) -> String {
    let suffix = match addr {
        Some(addr) => addr.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":"),
        None => format!("unknown-{node_id}"),
    };
    format!("{prefix}/{suffix}")
}

/// Publish one power report, applying dedup, topic composition and JSON
/// encoding. `addr` is the node's long address if known.
pub fn publish_power_report(
    publisher: &dyn Publisher,
    prefix: &str,
    gateway_id: u16,
    node_id: u16,
    addr: Option<&LongAddress>,
    report: &PowerReport,
) {
    let topic = topic_for(prefix, node_id, addr);
    let address = match addr {
        Some(addr) => addr.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":"),
        None => format!("unknown-{node_id}"),
    };
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    let record = Record {
        node_id,
        vin: round(report.v_in, 2),
        vout: round(report.v_out, 2),
        duty: round(report.duty_cycle, 2),
        ampsin: round(report.current_in, 3),
        temp: round(report.temperature, 1),
        rssi: report.rssi,
        slot: report.slot,
        power: round(report.power, 2),
        address,
        gateway_id,
        timestamp,
    };

    let payload = match serde_json::to_vec(&record) {
        Ok(p) => p,
        Err(e) => {
            error!("failed to encode power report payload: {e}");
            return;
        }
    };

    if let Err(e) = publisher.publish(&topic, &payload) {
        error!("failed to publish to {topic}: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        published: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl Publisher for Recorder {
        fn publish(&self, topic: &str, payload: &[u8]) -> Result<()> {
            self.published.lock().unwrap().push((topic.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    fn sample_report() -> PowerReport {
        PowerReport {
            v_in: 100.004,
            v_out: 50.0,
            duty_cycle: 99.996,
            current_in: 8.0001,
            temperature: 25.04,
            slot: 5,
            rssi: Some(123),
            power: 800.0001,
        }
    }

    #[test]
    fn topic_uses_unknown_without_topology() {
        assert_eq!(topic_for("tigo", 42, None), "tigo/unknown-42");
    }

    #[test]
    fn topic_uses_long_address_hex() {
        let addr = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11];
        assert_eq!(topic_for("tigo", 42, Some(&addr)), "tigo/aa:bb:cc:dd:ee:ff:00:11");
    }

    #[test]
    fn publishes_rounded_json_payload() {
        let recorder = Recorder::default();
        publish_power_report(&recorder, "tigo", 1, 42, None, &sample_report());

        let published = recorder.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        let (topic, payload) = &published[0];
        assert_eq!(topic, "tigo/unknown-42");

        let value: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(value["NodeID"], 42);
        assert_eq!(value["VIN"], 100.0);
        assert_eq!(value["AMPSIN"], 8.0);
        assert_eq!(value["SLOT"], 5);
        assert_eq!(value["RSSI"], 123);
    }
}
