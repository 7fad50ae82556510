//! Registry of backend constructors keyed by type name.
//!
//! The registry decouples which backend types exist from which type a
//! deployment configures. All built-in types register when the registry is
//! created; lookups afterwards only read the map.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, OnceLock};
use tracing::debug;

use crate::config::BackendConfig;
use crate::error::{Result, StorageError};
use crate::folder::{FolderStorage, FOLDER_TYPE};
use crate::traits::RecordStorage;

/// Builds a backend from its configuration entry.
pub type BackendConstructor =
    Arc<dyn Fn(&BackendConfig) -> Result<Arc<dyn RecordStorage>> + Send + Sync>;

/// Mapping from backend type name to constructor.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    constructors: HashMap<String, BackendConstructor>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in backend type.
    pub fn with_builtins() -> Self {
        let mut constructors: HashMap<String, BackendConstructor> = HashMap::new();
        constructors.insert(FOLDER_TYPE.to_string(), Arc::new(FolderStorage::build));
        Self { constructors }
    }

    /// The process-wide registry, populated with the built-in types on first use.
    pub fn global() -> Arc<BackendRegistry> {
        static GLOBAL: OnceLock<Arc<BackendRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(BackendRegistry::with_builtins())))
    }

    /// Register a constructor under a type name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::DuplicateType` if the name is taken.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F) -> Result<()>
    where
        F: Fn(&BackendConfig) -> Result<Arc<dyn RecordStorage>> + Send + Sync + 'static,
    {
        let kind = kind.into();
        if self.constructors.contains_key(&kind) {
            return Err(StorageError::DuplicateType(kind));
        }
        debug!("Registering storage type '{}'", kind);
        self.constructors.insert(kind, Arc::new(constructor));
        Ok(())
    }

    /// Names of all registered types.
    pub fn supported_types(&self) -> BTreeSet<String> {
        self.constructors.keys().cloned().collect()
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Build a backend of type `kind` from `config`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::UnknownType` if `kind` is not registered.
    /// Errors raised by the constructor are returned unchanged.
    pub fn create(&self, kind: &str, config: &BackendConfig) -> Result<Arc<dyn RecordStorage>> {
        let constructor = self
            .constructors
            .get(kind)
            .ok_or_else(|| StorageError::UnknownType(kind.to_string()))?;
        debug!("Creating {} storage '{}'", kind, config.instance_id());
        constructor(config)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("types", &self.supported_types())
            .finish()
    }
}
