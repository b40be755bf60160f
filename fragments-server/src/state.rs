//! Shared state of the HTTP server.

use std::sync::Arc;

use fragments_service::{FragmentStore, StorageConfig};

use crate::config::{Config, Storage};

/// Shared reference to the [server state](State).
pub type ServiceState = Arc<State>;

/// State shared with all HTTP request handlers.
///
/// In request handlers, use `axum::extract::State<ServiceState>` to retrieve a shared reference to
/// this structure.
#[derive(Debug)]
pub struct State {
    /// The server configuration.
    pub config: Config,
    /// The fragment store.
    pub store: FragmentStore,
}

impl State {
    /// Opens the configured storage.
    pub async fn new(config: Config) -> anyhow::Result<ServiceState> {
        let store = FragmentStore::new(map_storage_config(&config.storage)).await?;
        Ok(Arc::new(Self { config, store }))
    }
}

fn map_storage_config(config: &'_ Storage) -> StorageConfig<'_> {
    match config {
        Storage::Memory => StorageConfig::Memory,
        Storage::FileSystem { path } => StorageConfig::FileSystem { path },
    }
}
