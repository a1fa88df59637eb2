//! Command-line configuration.

use std::path::PathBuf;

use clap::Parser;

use crate::error::{Error, Result};

/// Bridge a Tigo-style radio-mesh gateway to an MQTT broker.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Opt {
    /// Serial device to read the gateway stream from (e.g. /dev/ttyUSB0).
    #[arg(long)]
    pub serial: Option<String>,

    /// Host of a serial-over-TCP tunnel to read the gateway stream from.
    #[arg(long)]
    pub tcp: Option<String>,

    /// Port for `--tcp`.
    #[arg(long, default_value = "7160")]
    pub port: u16,

    /// Serial baud rate.
    #[arg(long = "baud-rate", default_value = "38400")]
    pub baud_rate: u32,

    /// MQTT broker hostname.
    #[arg(long = "mqtt-server", default_value = "localhost")]
    pub mqtt_server: String,

    /// MQTT broker port.
    #[arg(long = "mqtt-port", default_value = "1883")]
    pub mqtt_port: u16,

    /// MQTT username, if the broker requires authentication.
    #[arg(long = "mqtt-username")]
    pub mqtt_username: Option<String>,

    /// MQTT password, if the broker requires authentication.
    #[arg(long = "mqtt-password")]
    pub mqtt_password: Option<String>,

    /// Topic prefix for published reports.
    #[arg(long = "mqtt-prefix", default_value = "tigo")]
    pub mqtt_prefix: String,

    /// Path to the persisted node table.
    #[arg(long = "node-table", default_value = "./node_table.json")]
    pub node_table: PathBuf,

    /// Deduplication window, in seconds. 0 or negative disables the gate.
    #[arg(long = "dedup-window", default_value = "5.0")]
    pub dedup_window: f64,

    /// Diagnostic verbosity; repeat for more (-v, -vv, -vvv).
    #[arg(short = 'v', long = "log-level", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Opt {
    /// Parse `std::env::args`, then validate cross-field constraints clap's
    /// derive macro can't express on its own (serial/TCP mutual exclusion).
    pub fn parse_validated() -> Result<Self> {
        let opt = Self::parse();
        opt.validate()?;
        Ok(opt)
    }

    fn validate(&self) -> Result<()> {
        match (&self.serial, &self.tcp) {
            (Some(_), Some(_)) => {
                Err(Error::Config("--serial and --tcp are mutually exclusive".into()))
            }
            (None, None) => Err(Error::Config("one of --serial or --tcp is required".into())),
            _ => Ok(()),
        }
    }
}
