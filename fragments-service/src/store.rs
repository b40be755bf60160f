//! The owner-scoped fragment store.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use bytes::Bytes;
use fragments_types::record::FragmentRecord;
use serde::Serialize;

use crate::backend::{BoxedBackend, InMemoryBackend, LocalFs};
use crate::error::{Error, Result};

/// Configuration to initialize a [`FragmentStore`].
#[derive(Debug, Clone)]
pub enum StorageConfig<'a> {
    /// Keep all fragments in process memory.
    Memory,
    /// Use a local filesystem directory as storage.
    FileSystem {
        /// The path to the directory where fragments will be stored.
        path: &'a Path,
    },
}

/// Rejects empty keys, which cannot be addressed in every backend.
fn check_key(owner_id: &str, id: Option<&str>) -> Result<()> {
    if owner_id.is_empty() {
        return Err(Error::Validation("ownerId must not be empty".into()));
    }
    if id.is_some_and(str::is_empty) {
        return Err(Error::Validation("id must not be empty".into()));
    }
    Ok(())
}

/// Result of [`FragmentStore::list_fragments`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Listing {
    /// Only the ids of the fragments.
    Ids(Vec<String>),
    /// The full metadata records.
    Records(Vec<FragmentRecord>),
}

impl Listing {
    /// Returns the number of listed fragments.
    pub fn len(&self) -> usize {
        match self {
            Listing::Ids(ids) => ids.len(),
            Listing::Records(records) => records.len(),
        }
    }

    /// Returns `true` if no fragments are listed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owner-scoped persistence of fragment metadata and data.
///
/// The store keeps two namespaces, metadata records and raw data, both keyed by
/// `(owner_id, id)`. There is no way to address a fragment by its id alone, so owners can never see
/// each other's fragments, even when ids collide.
///
/// This is a cheap handle around a shared [`Backend`](crate::backend::Backend) and can be cloned
/// freely.
#[derive(Clone, Debug)]
pub struct FragmentStore(Arc<FragmentStoreInner>);

#[derive(Debug)]
struct FragmentStoreInner {
    backend: BoxedBackend,
}

impl FragmentStore {
    /// Creates a new `FragmentStore` with the specified configuration.
    pub async fn new(config: StorageConfig<'_>) -> anyhow::Result<Self> {
        let backend: BoxedBackend = match config {
            StorageConfig::Memory => Box::new(InMemoryBackend::new()),
            StorageConfig::FileSystem { path } => {
                tokio::fs::create_dir_all(path)
                    .await
                    .with_context(|| format!("failed to create storage at {}", path.display()))?;
                Box::new(LocalFs::new(path))
            }
        };

        Ok(Self::from_backend(backend))
    }

    /// Creates a store on top of an existing backend.
    pub fn from_backend(backend: BoxedBackend) -> Self {
        tracing::debug!(backend = backend.name(), "initializing fragment store");
        Self(Arc::new(FragmentStoreInner { backend }))
    }

    /// Creates or replaces a metadata record.
    pub async fn write_fragment(&self, record: &FragmentRecord) -> Result<()> {
        check_key(&record.owner_id, Some(&record.id))?;
        tracing::debug!(owner_id = %record.owner_id, id = %record.id, "writing fragment metadata");
        self.0.backend.write_fragment(record).await?;
        Ok(())
    }

    /// Returns the metadata record stored for `(owner_id, id)`.
    pub async fn read_fragment(&self, owner_id: &str, id: &str) -> Result<Option<FragmentRecord>> {
        check_key(owner_id, Some(id))?;
        Ok(self.0.backend.read_fragment(owner_id, id).await?)
    }

    /// Creates or replaces the data stored for `(owner_id, id)`.
    pub async fn write_fragment_data(&self, owner_id: &str, id: &str, data: Bytes) -> Result<()> {
        check_key(owner_id, Some(id))?;
        tracing::debug!(owner_id, id, size = data.len(), "writing fragment data");
        self.0
            .backend
            .write_fragment_data(owner_id, id, data)
            .await?;
        Ok(())
    }

    /// Returns the data stored for `(owner_id, id)`.
    pub async fn read_fragment_data(&self, owner_id: &str, id: &str) -> Result<Option<Bytes>> {
        check_key(owner_id, Some(id))?;
        Ok(self.0.backend.read_fragment_data(owner_id, id).await?)
    }

    /// Lists all fragments of an owner.
    ///
    /// With `expand`, full metadata records are returned, otherwise only ids. The order is the one
    /// defined by the backend.
    pub async fn list_fragments(&self, owner_id: &str, expand: bool) -> Result<Listing> {
        check_key(owner_id, None)?;
        let records = self.0.backend.list_fragments(owner_id).await?;
        Ok(if expand {
            Listing::Records(records)
        } else {
            Listing::Ids(records.into_iter().map(|record| record.id).collect())
        })
    }

    /// Removes metadata and data of a fragment. Missing fragments are ignored.
    pub async fn delete_fragment(&self, owner_id: &str, id: &str) -> Result<()> {
        check_key(owner_id, Some(id))?;
        tracing::debug!(owner_id, id, "deleting fragment");
        self.0.backend.delete_fragment(owner_id, id).await?;
        Ok(())
    }

    /// Writes data and metadata of a fragment as one unit.
    ///
    /// Whether this is atomic depends on the backend, see
    /// [`Backend::commit`](crate::backend::Backend::commit). If it fails, the data may already
    /// have been written while the metadata was not.
    pub async fn commit(&self, record: &FragmentRecord, data: Bytes) -> Result<()> {
        check_key(&record.owner_id, Some(&record.id))?;
        tracing::debug!(
            owner_id = %record.owner_id,
            id = %record.id,
            size = data.len(),
            "committing fragment"
        );
        self.0.backend.commit(record, data).await?;
        Ok(())
    }
}
