//! Entry store: the primary key → record map.
//!
//! Last write wins; records are shared out by handle. A miss is a read-time
//! judgment made by the engine, never a mutation here, and nothing evicts
//! records; retention policy belongs to the host.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::entry::StoredRecord;
use crate::lock::{read_guard, write_guard};

const SOURCE: &str = "fresco::store";

/// Key → record map with last-write-wins semantics.
#[derive(Default)]
pub struct EntryStore {
    records: RwLock<HashMap<String, Arc<StoredRecord>>>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Unconditionally overwrite any existing record for `key`.
    pub fn put(&self, key: impl Into<String>, record: StoredRecord) {
        write_guard(&self.records, SOURCE, "put").insert(key.into(), Arc::new(record));
    }

    /// Shared handle to the record for `key`, if one was ever committed.
    pub fn get(&self, key: &str) -> Option<Arc<StoredRecord>> {
        read_guard(&self.records, SOURCE, "get").get(key).cloned()
    }

    /// Number of committed records, errored ones included.
    pub fn len(&self) -> usize {
        read_guard(&self.records, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every record (test teardown).
    pub fn clear(&self) {
        write_guard(&self.records, SOURCE, "clear").clear();
    }
}
