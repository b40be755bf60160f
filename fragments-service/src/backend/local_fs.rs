//! Local filesystem backend.
//!
//! Fragments are stored in one directory per owner:
//!
//! ```text
//! {root}/{owner}/{id}.json   metadata record
//! {root}/{owner}/{id}.bin    data
//! ```
//!
//! Owner and id are opaque strings, so both path components are encoded with BASE32HEX (no
//! padding). Files are written to a temporary sibling and renamed into place, which makes each
//! individual write atomic.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use data_encoding::BASE32HEX_NOPAD;
use fragments_types::record::FragmentRecord;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::common::{Backend, BackendError, BackendResult};

const METADATA_EXTENSION: &str = "json";
const DATA_EXTENSION: &str = "bin";

/// A [`Backend`] storing fragments as files in a local directory.
///
/// Listings are ordered by creation time and then by id, since directory order does not reflect
/// the order of writes.
#[derive(Debug)]
pub struct LocalFs {
    path: PathBuf,
}

impl LocalFs {
    /// Creates a backend rooted at `path`.
    ///
    /// Directories are created lazily on the first write.
    pub fn new(path: &Path) -> Self {
        Self { path: path.into() }
    }

    fn owner_dir(&self, owner_id: &str) -> PathBuf {
        self.path.join(encode_component(owner_id))
    }

    fn file_path(&self, owner_id: &str, id: &str, extension: &str) -> PathBuf {
        self.owner_dir(owner_id)
            .join(format!("{}.{extension}", encode_component(id)))
    }
}

fn encode_component(component: &str) -> String {
    BASE32HEX_NOPAD.encode(component.as_bytes())
}

/// Writes `contents` to a temporary file next to `path` and renames it into place.
async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    let result = async {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(contents).await?;
        file.sync_data().await?;
        drop(file);
        tokio::fs::rename(&temp_path, path).await
    }
    .await;

    if result.is_err() {
        tokio::fs::remove_file(&temp_path).await.ok();
    }
    result
}

async fn read_optional(path: &Path) -> std::io::Result<Option<Vec<u8>>> {
    match tokio::fs::read(path).await {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err),
    }
}

async fn remove_optional(path: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_file(path).await {
        Err(err) if err.kind() != ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

fn parse_record(contents: &[u8], path: &Path) -> BackendResult<FragmentRecord> {
    serde_json::from_slice(contents).map_err(|cause| BackendError::Serde {
        context: format!("failed to parse fragment metadata at {}", path.display()),
        cause,
    })
}

#[async_trait::async_trait]
impl Backend for LocalFs {
    fn name(&self) -> &'static str {
        "local-fs"
    }

    async fn write_fragment(&self, record: &FragmentRecord) -> BackendResult<()> {
        let path = self.file_path(&record.owner_id, &record.id, METADATA_EXTENSION);
        let contents = serde_json::to_vec(record).map_err(|cause| BackendError::Serde {
            context: format!("failed to serialize metadata of fragment {}", record.id),
            cause,
        })?;

        write_atomic(&path, &contents).await?;
        Ok(())
    }

    async fn read_fragment(
        &self,
        owner_id: &str,
        id: &str,
    ) -> BackendResult<Option<FragmentRecord>> {
        let path = self.file_path(owner_id, id, METADATA_EXTENSION);
        match read_optional(&path).await? {
            Some(contents) => parse_record(&contents, &path).map(Some),
            None => Ok(None),
        }
    }

    async fn write_fragment_data(
        &self,
        owner_id: &str,
        id: &str,
        data: Bytes,
    ) -> BackendResult<()> {
        let path = self.file_path(owner_id, id, DATA_EXTENSION);
        write_atomic(&path, &data).await?;
        Ok(())
    }

    async fn read_fragment_data(&self, owner_id: &str, id: &str) -> BackendResult<Option<Bytes>> {
        let path = self.file_path(owner_id, id, DATA_EXTENSION);
        Ok(read_optional(&path).await?.map(Bytes::from))
    }

    async fn list_fragments(&self, owner_id: &str) -> BackendResult<Vec<FragmentRecord>> {
        let mut entries = match tokio::fs::read_dir(self.owner_dir(owner_id)).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_none_or(|ext| ext != METADATA_EXTENSION) {
                continue;
            }

            // The fragment may have been deleted since the directory was read.
            let Some(contents) = read_optional(&path).await? else {
                tracing::debug!(path = %path.display(), "skipping vanished fragment");
                continue;
            };
            records.push(parse_record(&contents, &path)?);
        }

        records.sort_by(|a, b| a.created.cmp(&b.created).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    async fn delete_fragment(&self, owner_id: &str, id: &str) -> BackendResult<()> {
        remove_optional(&self.file_path(owner_id, id, DATA_EXTENSION)).await?;
        remove_optional(&self.file_path(owner_id, id, METADATA_EXTENSION)).await?;
        Ok(())
    }
}
