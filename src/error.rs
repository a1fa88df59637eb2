//! Crate-wide error type.
//!
//! Parse failures inside the decode pipeline (bad CRC, truncated packet,
//! unknown status type, ...) are *not* represented here: they are handled
//! as plain `Option`/`Result` values local to the parser that produced
//! them, logged, and the walk continues (see [`crate::receive_response`]
//! and [`crate::frame`]). `Error` is reserved for setup and I/O failures
//! that the supervisor must surface to `main`.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can stop the bridge outright.
#[derive(Error, Debug)]
pub enum Error {
    /// Opening or reading from the transport failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The transport hit end-of-stream (connection closed).
    #[error("transport closed")]
    TransportClosed,

    /// Node table could not be (de)serialized.
    #[error("node table error: {0}")]
    NodeTable(String),

    /// The MQTT client failed to connect after exhausting its retries.
    #[error("publisher connect failed: {0}")]
    PublisherConnect(String),

    /// A publish call failed.
    #[error("publish failed: {0}")]
    Publish(String),

    /// CLI arguments were contradictory (e.g. neither/both of serial+tcp).
    #[error("invalid configuration: {0}")]
    Config(String),
}
