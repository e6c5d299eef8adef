//! Record storage behind the retrieval layer.
//!
//! The index only knows unit ids. Content and metadata live in a
//! [`DocumentStore`] keyed by the same ids; the retriever joins the two at
//! query time and tolerates ids the store does not know.

use ahash::AHashMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::Result;

/// A stored record: a flat JSON object.
pub type Record = Map<String, Value>;

/// Key-value access to stored records.
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Fetch a record, `None` if the id is unknown.
    fn get(&self, id: &str) -> Result<Option<Record>>;

    /// Insert or replace a record.
    fn put(&self, id: &str, record: Record) -> Result<()>;

    /// Remove a record, returning whether it existed.
    fn remove(&self, id: &str) -> Result<bool>;

    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }
}

/// A store holding every record in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<AHashMap<String, Record>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Ids of all stored records, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.records.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<Record>> {
        Ok(self.records.read().get(id).cloned())
    }

    fn put(&self, id: &str, record: Record) -> Result<()> {
        self.records.write().insert(id.to_string(), record);
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool> {
        Ok(self.records.write().remove(id).is_some())
    }

    fn contains(&self, id: &str) -> Result<bool> {
        Ok(self.records.read().contains_key(id))
    }
}
