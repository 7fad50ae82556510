//! Entry point for building storage from configuration.

use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

use crate::config::{BackendConfig, StorageSection};
use crate::error::Result;
use crate::multi::MultiStorage;
use crate::registry::BackendRegistry;
use crate::traits::RecordStorage;

/// Builds backends from configuration entries through a [`BackendRegistry`].
///
/// Construction is fail-fast: a single bad entry fails the whole call and no
/// backend from that call is handed out.
#[derive(Debug, Clone)]
pub struct StorageController {
    registry: Arc<BackendRegistry>,
}

impl StorageController {
    /// Create a controller over an explicit registry.
    pub fn new(registry: Arc<BackendRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    /// Build one backend from its configuration entry.
    pub fn create_storage(&self, config: &BackendConfig) -> Result<Arc<dyn RecordStorage>> {
        let storage = self.registry.create(&config.kind, config)?;
        info!(
            "Storage '{}' ready ({})",
            storage.instance_id(),
            storage.backend_name()
        );
        Ok(storage)
    }

    /// Build one backend per entry, preserving order.
    ///
    /// # Errors
    ///
    /// Returns the first failing entry's error; backends already built by
    /// this call are dropped.
    pub fn create_storages<'a, I>(&self, configs: I) -> Result<Vec<Arc<dyn RecordStorage>>>
    where
        I: IntoIterator<Item = &'a BackendConfig>,
    {
        configs
            .into_iter()
            .map(|config| self.create_storage(config))
            .collect()
    }

    /// Build the storage a service uses from its configuration section.
    ///
    /// A single entry yields that backend; a list yields a [`MultiStorage`]
    /// over all entries in order.
    pub fn from_section(&self, section: &StorageSection) -> Result<Arc<dyn RecordStorage>> {
        let entries = section.entries()?;
        if section.storage.is_some() {
            return self.create_storage(entries[0]);
        }

        let backends = self.create_storages(entries)?;
        Ok(Arc::new(MultiStorage::new("storages", backends)))
    }

    /// Type names the registry can build.
    pub fn supported_storage_ids(&self) -> BTreeSet<String> {
        self.registry.supported_types()
    }
}

impl Default for StorageController {
    /// A controller over [`BackendRegistry::global`].
    fn default() -> Self {
        Self::new(BackendRegistry::global())
    }
}
