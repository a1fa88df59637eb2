//! Persistent `node_id -> long_address` table.
//!
//! Backed by a JSON array on disk rather than the original's pickled
//! dict: pickle is a language-specific object format and a reimplementation
//! hazard, not a wire contract worth preserving.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::Result;
use crate::packets::LongAddress;

#[derive(Serialize, Deserialize)]
struct Entry {
    id: u16,
    addr_hex: String,
}

fn to_hex(addr: &LongAddress) -> String {
    addr.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(":")
}

fn from_hex(s: &str) -> Option<LongAddress> {
    let mut addr = [0u8; 8];
    let mut i = 0;
    for part in s.split(':') {
        let byte = u8::from_str_radix(part, 16).ok()?;
        *addr.get_mut(i)? = byte;
        i += 1;
    }
    (i == 8).then_some(addr)
}

/// Mapping from short node identifiers to stable long addresses, learned
/// from topology reports and persisted across restarts.
pub struct NodeTable {
    path: PathBuf,
    entries: BTreeMap<u16, LongAddress>,
}

impl NodeTable {
    /// Load the table from `path`. A missing file is not an error: it
    /// starts the table empty. A present-but-unreadable or malformed file
    /// logs an error and also starts empty -- topology learning simply
    /// resumes from scratch.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<Vec<Entry>>(&bytes) {
                Ok(entries) => {
                    log::info!("loaded node table from {}", path.display());
                    entries
                        .into_iter()
                        .filter_map(|e| from_hex(&e.addr_hex).map(|a| (e.id, a)))
                        .collect()
                }
                Err(e) => {
                    log::error!("node table at {} is malformed: {e}", path.display());
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("no node table at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => {
                log::error!("failed to read node table at {}: {e}", path.display());
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    /// Look up a node's long address.
    pub fn get(&self, node_id: u16) -> Option<&LongAddress> {
        self.entries.get(&node_id)
    }

    /// Insert or overwrite a node's long address and persist the table
    /// synchronously. Persistence failures are logged and otherwise
    /// ignored: the in-memory table remains authoritative for this process.
    pub fn update(&mut self, node_id: u16, addr: LongAddress) {
        self.entries.insert(node_id, addr);
        if let Err(e) = self.persist() {
            log::error!("failed to persist node table: {e}");
        }
    }

    fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::error::Error::NodeTable(e.to_string()))?;
        }
        let entries: Vec<Entry> = self
            .entries
            .iter()
            .map(|(&id, addr)| Entry { id, addr_hex: to_hex(addr) })
            .collect();
        let json = serde_json::to_vec_pretty(&entries)
            .map_err(|e| crate::error::Error::NodeTable(e.to_string()))?;

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = NamedTempFile::new_in(dir)
            .map_err(|e| crate::error::Error::NodeTable(e.to_string()))?;
        use std::io::Write;
        tmp.write_all(&json).map_err(|e| crate::error::Error::NodeTable(e.to_string()))?;
        tmp.persist(&self.path).map_err(|e| crate::error::Error::NodeTable(e.to_string()))?;
        Ok(())
    }
}

impl fmt::Display for NodeTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----------------------------------")?;
        writeln!(f, "| NODE | ADDRESS                 |")?;
        for (node_id, addr) in &self.entries {
            writeln!(f, "| {node_id:04} | {:23} |", to_hex(addr))?;
        }
        writeln!(f, "----------------------------------")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_starts_empty() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let table = NodeTable::load(dir.path().join("nope.json"));
        assert!(table.get(1).is_none());
        Ok(())
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.json");

        let addr = [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF, 0x00, 0x11];
        let mut table = NodeTable::load(&path);
        table.update(42, addr);

        let reloaded = NodeTable::load(&path);
        assert_eq!(reloaded.get(42), Some(&addr));
    }

    #[test]
    fn malformed_file_starts_empty_instead_of_failing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, b"not json").unwrap();
        let table = NodeTable::load(&path);
        assert!(table.get(0).is_none());
    }

    #[test]
    fn display_matches_fixed_width_layout() {
        let dir = tempfile::tempdir().unwrap();
        let mut table = NodeTable::load(dir.path().join("nodes.json"));
        table.update(7, [1, 2, 3, 4, 5, 6, 7, 8]);
        let rendered = table.to_string();
        assert!(rendered.contains("| 0007 |"));
        assert!(rendered.contains("01:02:03:04:05:06:07:08"));
    }
}
