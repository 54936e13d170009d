//! The routing table collaborator.
//!
//! The proxy's routing table is authoritative for active backends; the
//! reconciler only mirrors it. The trait is synchronous because registration
//! is an in-memory mutation on the proxy side.

use std::collections::BTreeMap;
use std::sync::RwLock;

/// A named, addressable game-server instance registered with the routing layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRecord {
    /// Globally unique backend id, e.g. `"lobby-1"`.
    pub id: String,
    /// Host part of the address; resolves on the container network.
    pub address: String,
    pub port: u16,
}

/// Narrow interface to the proxy's backend routing table.
pub trait RoutingTable: Send + Sync {
    /// Registers a backend. Registering an id that is already present is a
    /// no-op, not an error.
    fn register(&self, record: BackendRecord);

    /// Unregisters a backend. Unknown ids are ignored.
    fn unregister(&self, id: &str);

    fn is_registered(&self, id: &str) -> bool;

    fn lookup(&self, id: &str) -> Option<BackendRecord>;
}

/// In-memory routing table, used by tests and the CLI's dry-run mode.
#[derive(Debug, Default)]
pub struct MemoryRoutingTable {
    entries: RwLock<BTreeMap<String, BackendRecord>>,
}

impl MemoryRoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// All registered backend ids, sorted.
    pub fn backend_ids(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect()
    }
}

impl RoutingTable for MemoryRoutingTable {
    fn register(&self, record: BackendRecord) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(record.id.clone())
            .or_insert(record);
    }

    fn unregister(&self, id: &str) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    fn is_registered(&self, id: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    fn lookup(&self, id: &str) -> Option<BackendRecord> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }
}
