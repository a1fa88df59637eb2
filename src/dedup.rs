//! Deduplication gate: suppresses near-identical power reports inside a
//! sliding time window, keyed per `(gateway_id, node_id)`.

use std::collections::HashMap;
use std::time::Instant;

use crate::packets::PowerReport;

#[derive(Clone, Copy)]
struct LastSeen {
    time: Instant,
    slot: u16,
    v_in: f64,
    current_in: f64,
    temperature: f64,
}

/// Per-`(gateway, node)` sliding-window suppressor. Entries never expire;
/// the table is bounded by the number of distinct nodes ever seen.
pub struct DedupState {
    window: f64,
    last: HashMap<(u16, u16), LastSeen>,
}

impl DedupState {
    /// `window_seconds <= 0` disables the gate entirely: every report is
    /// published.
    pub fn new(window_seconds: f64) -> Self {
        Self { window: window_seconds, last: HashMap::new() }
    }

    /// Decide whether this report should be published, and update the
    /// recorded state for the key.
    ///
    /// The recorded state is updated on *every* call, including ones that
    /// return `false` -- this mirrors an intentionally preserved quirk of
    /// the source rather than a "reset the window on suppress" policy.
    pub fn should_publish(&mut self, gateway_id: u16, node_id: u16, report: &PowerReport) -> bool {
        if self.window <= 0.0 {
            return true;
        }

        let now = Instant::now();
        let key = (gateway_id, node_id);
        let publish = match self.last.get(&key) {
            None => true,
            Some(prev) => {
                now.duration_since(prev.time).as_secs_f64() >= self.window
                    || report.slot != prev.slot
                    || (report.v_in - prev.v_in).abs() >= 0.2
                    || (report.current_in - prev.current_in).abs() >= 0.05
                    || (report.temperature - prev.temperature).abs() >= 0.5
            }
        };

        self.last.insert(
            key,
            LastSeen {
                time: now,
                slot: report.slot,
                v_in: report.v_in,
                current_in: report.current_in,
                temperature: report.temperature,
            },
        );
        publish
    }
}
