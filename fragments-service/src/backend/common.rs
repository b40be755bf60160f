use std::fmt::Debug;

use bytes::Bytes;
use fragments_types::record::FragmentRecord;
use thiserror::Error;

/// A type-erased [`Backend`] instance.
pub type BoxedBackend = Box<dyn Backend>;

/// Owner-scoped persistence for fragments.
///
/// A backend keeps two independent namespaces, metadata records and raw data, both keyed by the
/// pair `(owner_id, id)`. Every operation takes both components explicitly, so two owners may use
/// the same id without interfering with each other. Reads of missing keys return `Ok(None)`.
///
/// Concurrent writes to the same key are last-write-wins. Backends do not retry, and do not
/// enforce timeouts.
#[async_trait::async_trait]
pub trait Backend: Debug + Send + Sync + 'static {
    /// The backend name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Creates or replaces the metadata record under `(record.owner_id, record.id)`.
    async fn write_fragment(&self, record: &FragmentRecord) -> BackendResult<()>;

    /// Returns the metadata record stored for the key, if any.
    async fn read_fragment(&self, owner_id: &str, id: &str)
    -> BackendResult<Option<FragmentRecord>>;

    /// Creates or replaces the data stored for the key.
    ///
    /// This does not require a metadata record to exist.
    async fn write_fragment_data(&self, owner_id: &str, id: &str, data: Bytes)
    -> BackendResult<()>;

    /// Returns the data stored for the key, if any.
    async fn read_fragment_data(&self, owner_id: &str, id: &str) -> BackendResult<Option<Bytes>>;

    /// Returns all metadata records of the owner.
    ///
    /// Records that disappear while the listing is in progress are skipped.
    async fn list_fragments(&self, owner_id: &str) -> BackendResult<Vec<FragmentRecord>>;

    /// Removes both the metadata record and the data stored for the key.
    ///
    /// Deleting a key that does not exist is not an error.
    async fn delete_fragment(&self, owner_id: &str, id: &str) -> BackendResult<()>;

    /// Writes the data and then the metadata of a fragment.
    ///
    /// The default implementation is **not atomic**. If the metadata write fails after the data
    /// write succeeded, the new data is persisted next to the previous metadata record, whose
    /// `size` no longer matches. Callers receive the error and may retry the whole commit. Backends
    /// with transactional storage should override this method.
    async fn commit(&self, record: &FragmentRecord, data: Bytes) -> BackendResult<()> {
        self.write_fragment_data(&record.owner_id, &record.id, data)
            .await?;
        self.write_fragment(record).await
    }
}

/// Errors raised by storage backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// IO errors related to file operations.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors related to de/serialization of metadata records.
    #[error("serde error: {context}")]
    Serde {
        /// What the backend was doing.
        context: String,
        /// The underlying error.
        #[source]
        cause: serde_json::Error,
    },
}

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;
