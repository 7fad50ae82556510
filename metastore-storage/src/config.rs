//! Declarative storage configuration.
//!
//! # Configuration Examples
//!
//! ## Single backend
//!
//! ```yaml
//! storage:
//!   type: folder
//!   id: main
//!   root: ~/records
//!   recursive: false
//!   cache: true
//! ```
//!
//! ## Several backends, queried in order
//!
//! ```yaml
//! storages:
//!   - type: folder
//!     id: current
//!     root: /srv/records/current
//!   - type: folder
//!     id: archive
//!     root: /srv/records/archive
//!     recursive: true
//! ```
//!
//! Only `type` is interpreted here. Every other key of an entry is handed to
//! the backend constructor registered for that type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StorageError};

/// One backend instance in the configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Registered backend type, e.g. `folder`
    #[serde(rename = "type")]
    pub kind: String,

    /// Instance label; defaults to the type name
    #[serde(
        default,
        rename = "id",
        alias = "instance_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub instance_id: Option<String>,

    /// Backend-specific options
    #[serde(flatten)]
    pub options: BTreeMap<String, serde_yaml::Value>,
}

impl BackendConfig {
    /// Create an entry for a backend type with no options.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            instance_id: None,
            options: BTreeMap::new(),
        }
    }

    /// Set the instance label.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.instance_id = Some(id.into());
        self
    }

    /// Set a backend-specific option.
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Instance label, falling back to the type name.
    pub fn instance_id(&self) -> &str {
        self.instance_id.as_deref().unwrap_or(&self.kind)
    }

    /// Deserialize the backend-specific options into a typed config.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Config` naming the instance when an option is
    /// missing or has the wrong type.
    pub fn options<T: DeserializeOwned>(&self) -> Result<T> {
        let mapping: serde_yaml::Mapping = self
            .options
            .iter()
            .map(|(k, v)| (serde_yaml::Value::String(k.clone()), v.clone()))
            .collect();

        serde_yaml::from_value(serde_yaml::Value::Mapping(mapping)).map_err(|e| {
            StorageError::Config(format!(
                "{} storage '{}': {}",
                self.kind,
                self.instance_id(),
                e
            ))
        })
    }
}

/// The storage part of a service configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct StorageSection {
    /// A single backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage: Option<BackendConfig>,

    /// An ordered list of backends
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub storages: Vec<BackendConfig>,
}

impl StorageSection {
    /// Parse a section from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load a section from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            StorageError::Config(format!("Cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// The configured backend entries, in order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Config` unless exactly one of `storage` and
    /// `storages` is set.
    pub fn entries(&self) -> Result<Vec<&BackendConfig>> {
        match (&self.storage, self.storages.is_empty()) {
            (Some(single), true) => Ok(vec![single]),
            (None, false) => Ok(self.storages.iter().collect()),
            (Some(_), false) => Err(StorageError::Config(
                "both 'storage' and 'storages' are set; use one".to_string(),
            )),
            (None, true) => Err(StorageError::Config(
                "no 'storage' or 'storages' entry configured".to_string(),
            )),
        }
    }
}

/// Expand a leading `~` to the home directory.
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = home_dir()?;
        Ok(home.join(rest))
    } else if s == "~" {
        home_dir()
    } else {
        Ok(path.to_path_buf())
    }
}

fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| StorageError::Config("Cannot determine home directory".to_string()))
}
