//! Folder storage implementation.
//!
//! Serves each file under a root directory as one record, addressed by its
//! file name (or, with recursive lookup, by its root-relative path).

use bytes::Bytes;
use serde::Deserialize;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::cache::{CacheStats, RecordCache};
use crate::config::{expand_tilde, BackendConfig};
use crate::error::{Result, StorageError};
use crate::extract::RecordExtractor;
use crate::traits::RecordStorage;

/// Registered type name of the folder backend.
pub const FOLDER_TYPE: &str = "folder";

/// Options of a `folder` configuration entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FolderConfig {
    /// Directory holding the record files
    #[serde(alias = "path")]
    pub root: PathBuf,

    /// Look up ids in subdirectories as well
    #[serde(default)]
    pub recursive: bool,

    /// Keep content in memory after the first successful read
    #[serde(default)]
    pub cache: bool,
}

/// Folder storage backend.
///
/// Lookup rules:
/// - ids containing `..`, `.`, a root or a drive prefix never resolve
/// - without `recursive`, an id must be the file name of a direct child of the root
/// - with `recursive`, an id may be a root-relative path; a bare file name
///   missing from the root is searched for in subdirectories, depth-first in
///   name order
/// - directories are never records
pub struct FolderStorage {
    instance_id: String,
    root: PathBuf,
    recursive: bool,
    cache: Option<RecordCache>,
    extractor: Option<Arc<RecordExtractor>>,
}

impl FolderStorage {
    /// Create a non-recursive, uncached folder backend.
    ///
    /// The root is not checked; lookups against a missing root fail with
    /// `NotFound`. Use [`FolderStorage::from_config`] to validate it.
    pub fn new(instance_id: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            instance_id: instance_id.into(),
            root: root.into(),
            recursive: false,
            cache: None,
            extractor: None,
        }
    }

    /// Enable or disable lookup in subdirectories.
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Enable or disable the in-memory content cache.
    pub fn cached(mut self, cache: bool) -> Self {
        self.cache = cache.then(RecordCache::new);
        self
    }

    /// Use a custom extractor for derived fields.
    pub fn with_extractor(mut self, extractor: Arc<RecordExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Build a backend from typed options, failing if the root is not a directory.
    pub fn from_config(instance_id: impl Into<String>, config: &FolderConfig) -> Result<Self> {
        let instance_id = instance_id.into();
        let root = expand_tilde(&config.root)?;

        if !root.is_dir() {
            return Err(StorageError::Config(format!(
                "{} storage '{}': root '{}' is not a directory",
                FOLDER_TYPE,
                instance_id,
                root.display()
            )));
        }

        debug!(
            "Folder storage '{}' at {:?} (recursive={}, cache={})",
            instance_id, root, config.recursive, config.cache
        );

        Ok(Self::new(instance_id, root)
            .recursive(config.recursive)
            .cached(config.cache))
    }

    /// Registry constructor for the `folder` type.
    pub fn build(config: &BackendConfig) -> Result<Arc<dyn RecordStorage>> {
        let options: FolderConfig = config.options()?;
        Ok(Arc::new(Self::from_config(config.instance_id(), &options)?))
    }

    /// Get the root directory of this storage.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }

    /// Cache statistics, if caching is enabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(RecordCache::stats)
    }

    /// Resolve a record id to an existing file under the root.
    fn resolve(&self, id: &str) -> Result<PathBuf> {
        let relative = Path::new(id);
        let depth = relative.components().count();
        let addressable = depth > 0
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));

        if !addressable || (!self.recursive && depth != 1) {
            debug!("Id {:?} is not addressable in {:?}", id, self.root);
            return Err(StorageError::NotFound(id.to_string()));
        }

        let candidate = self.root.join(relative);
        if is_file(&candidate)? {
            return Ok(candidate);
        }

        if self.recursive && depth == 1 {
            if let Some(found) = find_nested(&self.root, relative)? {
                debug!("Resolved {:?} to nested {:?}", id, found);
                return Ok(found);
            }
        }

        Err(StorageError::NotFound(id.to_string()))
    }

    /// Collect record ids below `dir`; `prefix` is the id path of `dir`.
    fn collect_ids(&self, dir: &Path, prefix: &str, ids: &mut Vec<String>) -> Result<()> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let id = if prefix.is_empty() {
                name
            } else {
                format!("{}/{}", prefix, name)
            };

            if entry.file_type()?.is_dir() {
                if self.recursive {
                    self.collect_ids(&entry.path(), &id, ids)?;
                }
            } else if is_file(&entry.path())? {
                ids.push(id);
            }
        }

        Ok(())
    }
}

/// Follows symlinks; a dangling link or missing path is not a file.
fn is_file(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(e) if names_nothing(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

/// Errors meaning the path cannot name an existing file, as opposed to a
/// file that exists but cannot be read.
fn names_nothing(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound
            | io::ErrorKind::NotADirectory
            | io::ErrorKind::InvalidInput
            | io::ErrorKind::InvalidFilename
    )
}

/// Depth-first search for `name` in the subdirectories of `dir`.
///
/// Subdirectories are visited in name order. Symlinked directories are not
/// descended into.
fn find_nested(dir: &Path, name: &Path) -> Result<Option<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut subdirs = Vec::new();
    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.path());
        }
    }
    subdirs.sort();

    for subdir in subdirs {
        let candidate = subdir.join(name);
        if is_file(&candidate)? {
            return Ok(Some(candidate));
        }
        if let Some(found) = find_nested(&subdir, name)? {
            return Ok(Some(found));
        }
    }

    Ok(None)
}

impl RecordStorage for FolderStorage {
    #[instrument(skip(self), fields(instance = %self.instance_id))]
    fn raw_record(&self, id: &str) -> Result<Bytes> {
        if let Some(cache) = &self.cache {
            if let Some(content) = cache.get(id) {
                debug!("Cache hit for {:?}", id);
                return Ok(content);
            }
        }

        let path = self.resolve(id)?;
        debug!("Reading from {:?}", path);

        let content = match fs::read(&path) {
            Ok(data) => Bytes::from(data),
            Err(e) if names_nothing(&e) => return Err(StorageError::NotFound(id.to_string())),
            Err(e) => return Err(e.into()),
        };

        if let Some(cache) = &self.cache {
            cache.insert(id, content.clone());
        }

        Ok(content)
    }

    fn record_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        self.collect_ids(&self.root, "", &mut ids)?;
        ids.sort();
        Ok(ids)
    }

    fn extractor(&self) -> &RecordExtractor {
        self.extractor
            .as_deref()
            .unwrap_or_else(|| RecordExtractor::standard())
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn backend_name(&self) -> &'static str {
        FOLDER_TYPE
    }
}

impl std::fmt::Debug for FolderStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderStorage")
            .field("instance_id", &self.instance_id)
            .field("root", &self.root)
            .field("recursive", &self.recursive)
            .field("cache", &self.cache)
            .finish()
    }
}
