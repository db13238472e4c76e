//! # Metadata Store
//!
//! Last-write-wins lookup of [`MediaRecord`]s by media id. Queue and browse
//! responses resolve ids through it, and inbound queue commands use it to turn
//! an id back into a full record.
//!
//! There is no per-entry eviction: entries live until [`MetadataStore::clear`]
//! is called on session teardown.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::record::{MediaRecord, RawMediaItem};

#[derive(Debug, Default)]
pub struct MetadataStore {
    records: RwLock<HashMap<String, Arc<MediaRecord>>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `record`, replacing any record with the same id.
    ///
    /// Returns the stored record so that building and registering are one
    /// step for callers.
    pub fn put(&self, record: MediaRecord) -> Arc<MediaRecord> {
        let record = Arc::new(record);
        let previous = self
            .records
            .write()
            .insert(record.id.clone(), Arc::clone(&record));
        if previous.is_some() {
            debug!(media_id = %record.id, "Replaced metadata record");
        }
        record
    }

    /// Builds a record from an application-layer item and registers it.
    pub fn create(&self, raw: RawMediaItem) -> Arc<MediaRecord> {
        self.put(raw.into_record())
    }

    pub fn get(&self, id: &str) -> Option<Arc<MediaRecord>> {
        self.records.read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.read().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drops every record.
    pub fn clear(&self) {
        let mut records = self.records.write();
        let count = records.len();
        records.clear();
        debug!(count, "Cleared metadata store");
    }
}
