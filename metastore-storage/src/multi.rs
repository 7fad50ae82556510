//! Composed view over several backends.

use bytes::Bytes;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::error::{Result, StorageError};
use crate::record::Record;
use crate::traits::RecordStorage;

/// Registered name reported by the composed view.
pub const MULTI_TYPE: &str = "multi";

/// Backends queried in configuration order.
///
/// The first backend holding a record serves it. `NotFound` is returned only
/// when every backend reports `NotFound`; any other failure stops the lookup
/// and is returned as is.
pub struct MultiStorage {
    instance_id: String,
    backends: Vec<Arc<dyn RecordStorage>>,
}

impl MultiStorage {
    pub fn new(instance_id: impl Into<String>, backends: Vec<Arc<dyn RecordStorage>>) -> Self {
        Self {
            instance_id: instance_id.into(),
            backends,
        }
    }

    pub fn backends(&self) -> &[Arc<dyn RecordStorage>] {
        &self.backends
    }

    /// Run `lookup` against each backend until one has the record.
    fn first_hit<T>(&self, id: &str, lookup: impl Fn(&dyn RecordStorage) -> Result<T>) -> Result<T> {
        for backend in &self.backends {
            match lookup(backend.as_ref()) {
                Err(e) if e.is_not_found() => {
                    debug!("{} not in '{}'", id, backend.instance_id());
                }
                result => return result,
            }
        }
        Err(StorageError::NotFound(id.to_string()))
    }
}

impl RecordStorage for MultiStorage {
    #[instrument(skip(self), fields(instance = %self.instance_id))]
    fn raw_record(&self, id: &str) -> Result<Bytes> {
        self.first_hit(id, |backend| backend.raw_record(id))
    }

    /// Delegates so each record is built with its own backend's extractor.
    #[instrument(skip(self), fields(instance = %self.instance_id))]
    fn record(&self, id: &str) -> Result<Record> {
        self.first_hit(id, |backend| backend.record(id))
    }

    /// Union of all listable backends, sorted and without duplicates.
    fn record_ids(&self) -> Result<Vec<String>> {
        let mut ids = BTreeSet::new();
        for backend in &self.backends {
            match backend.record_ids() {
                Ok(found) => ids.extend(found),
                Err(StorageError::NotSupported(_)) => {
                    debug!("'{}' cannot list records", backend.instance_id());
                }
                Err(e) => return Err(e),
            }
        }
        Ok(ids.into_iter().collect())
    }

    fn instance_id(&self) -> &str {
        &self.instance_id
    }

    fn backend_name(&self) -> &'static str {
        MULTI_TYPE
    }
}

impl std::fmt::Debug for MultiStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let backends: Vec<_> = self.backends.iter().map(|b| b.instance_id()).collect();
        f.debug_struct("MultiStorage")
            .field("instance_id", &self.instance_id)
            .field("backends", &backends)
            .finish()
    }
}
