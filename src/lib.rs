#![warn(missing_docs)]
/*! Bridge between a Tigo-style radio-mesh photovoltaic-optimizer gateway
and an MQTT broker.

The gateway speaks a byte-stuffed, CRC-protected framing protocol over a
serial line or a serial-over-TCP tunnel. Each frame carries an envelope;
`RECEIVE_RESPONSE` envelopes carry zero or more embedded radio packets,
two of which this bridge understands: power reports (per-optimizer
telemetry) and topology reports (which teach it a node's stable long
address). Power reports are deduplicated and republished as JSON on an
MQTT topic keyed by that long address.

# Pipeline

```text
   Transport
       |
  Frame Decoder      (byte-stuffing, CRC)
       |
 Frame Classifier     (direction, envelope type)
       |
Receive-Response Parser  (status preamble, embedded packets)
       |
  Packet Handlers     (power report | topology report)
       |           \
  Dedup Gate      Node Table
       |
 Publisher Adapter
```

Everything above the transport is single-threaded and processes one
frame to completion before the next read; see [`supervisor`].
*/

pub mod classifier;
pub mod config;
pub mod dedup;
pub mod error;
pub mod frame;
pub mod node_table;
pub mod packet_registry;
pub mod packets;
pub mod publisher;
pub mod receive_response;
pub mod supervisor;
pub mod transport;

pub use error::{Error, Result};
