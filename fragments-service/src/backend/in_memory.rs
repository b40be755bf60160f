//! In-memory backend.
//!
//! This provides a [`Backend`] backed by `HashMap`s. Contents are lost when the process exits,
//! which makes it suitable for tests and local development. The backend is [`Clone`] so tests can
//! hold a handle for direct inspection while the store owns a boxed copy.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use fragments_types::record::FragmentRecord;

use super::common::{Backend, BackendResult};

/// All fragments of a single owner.
#[derive(Debug, Default)]
struct OwnerEntries {
    /// Ids of metadata records in first-insert order.
    order: Vec<String>,
    records: HashMap<String, FragmentRecord>,
    data: HashMap<String, Bytes>,
}

impl OwnerEntries {
    fn insert_record(&mut self, record: &FragmentRecord) {
        let previous = self.records.insert(record.id.clone(), record.clone());
        if previous.is_none() {
            self.order.push(record.id.clone());
        }
    }

    fn remove(&mut self, id: &str) {
        if self.records.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
        }
        self.data.remove(id);
    }

    fn is_empty(&self) -> bool {
        self.records.is_empty() && self.data.is_empty()
    }
}

/// A [`Backend`] keeping all fragments in process memory.
///
/// Listings follow the order in which metadata records were first written. Overwriting a record
/// keeps its position.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    owners: Arc<Mutex<HashMap<String, OwnerEntries>>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the backend stores nothing at all.
    pub fn is_empty(&self) -> bool {
        self.owners.lock().unwrap().is_empty()
    }
}

#[async_trait::async_trait]
impl Backend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn write_fragment(&self, record: &FragmentRecord) -> BackendResult<()> {
        let mut owners = self.owners.lock().unwrap();
        owners
            .entry(record.owner_id.clone())
            .or_default()
            .insert_record(record);
        Ok(())
    }

    async fn read_fragment(
        &self,
        owner_id: &str,
        id: &str,
    ) -> BackendResult<Option<FragmentRecord>> {
        let owners = self.owners.lock().unwrap();
        Ok(owners
            .get(owner_id)
            .and_then(|entries| entries.records.get(id))
            .cloned())
    }

    async fn write_fragment_data(
        &self,
        owner_id: &str,
        id: &str,
        data: Bytes,
    ) -> BackendResult<()> {
        let mut owners = self.owners.lock().unwrap();
        owners
            .entry(owner_id.to_owned())
            .or_default()
            .data
            .insert(id.to_owned(), data);
        Ok(())
    }

    async fn read_fragment_data(&self, owner_id: &str, id: &str) -> BackendResult<Option<Bytes>> {
        let owners = self.owners.lock().unwrap();
        Ok(owners
            .get(owner_id)
            .and_then(|entries| entries.data.get(id))
            .cloned())
    }

    async fn list_fragments(&self, owner_id: &str) -> BackendResult<Vec<FragmentRecord>> {
        let owners = self.owners.lock().unwrap();
        let Some(entries) = owners.get(owner_id) else {
            return Ok(Vec::new());
        };

        Ok(entries
            .order
            .iter()
            .filter_map(|id| entries.records.get(id))
            .cloned()
            .collect())
    }

    async fn delete_fragment(&self, owner_id: &str, id: &str) -> BackendResult<()> {
        let mut owners = self.owners.lock().unwrap();
        if let Some(entries) = owners.get_mut(owner_id) {
            entries.remove(id);
            if entries.is_empty() {
                owners.remove(owner_id);
            }
        }
        Ok(())
    }

    /// Writes data and metadata under a single lock, so readers never observe one without the
    /// other.
    async fn commit(&self, record: &FragmentRecord, data: Bytes) -> BackendResult<()> {
        let mut owners = self.owners.lock().unwrap();
        let entries = owners.entry(record.owner_id.clone()).or_default();
        entries.data.insert(record.id.clone(), data);
        entries.insert_record(record);
        Ok(())
    }
}
