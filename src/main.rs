//! Binary entry point: parses the CLI, wires up transport/publisher/node
//! table, and runs the supervisor until shutdown or a fatal error.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use clap::Parser;

use tigo_bridge::config::Opt;
use tigo_bridge::node_table::NodeTable;
use tigo_bridge::publisher::{MqttPublisher, MqttSettings};
use tigo_bridge::supervisor::Supervisor;
use tigo_bridge::transport::{SerialTransport, TcpTransport};

fn main() -> Result<()> {
    let opt = Opt::parse_validated()?;
    stderrlog::new()
        .module(module_path!())
        .module("tigo_bridge")
        .quiet(false)
        .verbosity(opt.verbose as usize + 1)
        .timestamp(stderrlog::Timestamp::Second)
        .init()?;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = running.clone();
        ctrlc::set_handler(move || {
            log::info!("received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let node_table = NodeTable::load(&opt.node_table);
    let publisher = MqttPublisher::connect(MqttSettings {
        server: opt.mqtt_server.clone(),
        port: opt.mqtt_port,
        username: opt.mqtt_username.clone(),
        password: opt.mqtt_password.clone(),
        prefix: opt.mqtt_prefix.clone(),
    })?;

    if let Some(device) = &opt.serial {
        let transport = SerialTransport::open(device, opt.baud_rate)?;
        run(transport, publisher, opt, node_table, running)
    } else if let Some(host) = &opt.tcp {
        let transport = TcpTransport::connect(host, opt.port)?;
        run(transport, publisher, opt, node_table, running)
    } else {
        unreachable!("Opt::parse_validated guarantees exactly one source")
    }
}

fn run<T: tigo_bridge::transport::Transport>(
    transport: T,
    publisher: MqttPublisher,
    opt: Opt,
    node_table: NodeTable,
    running: Arc<AtomicBool>,
) -> Result<()> {
    let mut supervisor = Supervisor::new(
        transport,
        publisher,
        opt.mqtt_prefix,
        node_table,
        opt.dedup_window,
        running,
    );
    supervisor.run().map_err(Into::into)
}
