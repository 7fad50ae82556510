//! Core storage trait definitions.
//!
//! The `RecordStorage` trait is the capability contract every backend
//! implements (folder today, databases or object stores in the general case).
//! Callers hold backends as `Arc<dyn RecordStorage>` and never need to know
//! which concrete type they talk to.

use bytes::Bytes;

use crate::error::{Result, StorageError};
use crate::extract::RecordExtractor;
use crate::record::Record;

/// Read-only record retrieval.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`. A backend instance is shared
/// between concurrent lookups without external locking; any internal cache
/// must be synchronized by the backend itself.
///
/// # Error Handling
///
/// Lookups fail with `StorageError::NotFound` when no content is addressable
/// under the id and with `StorageError::Io` on read failures. Errors are
/// returned to the caller with their kind preserved.
pub trait RecordStorage: Send + Sync {
    /// Read the raw content addressed by `id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if no content exists for the id.
    fn raw_record(&self, id: &str) -> Result<Bytes>;

    /// Read the content addressed by `id` and wrap it into a [`Record`].
    ///
    /// Derived fields are extracted with [`RecordStorage::extractor`].
    fn record(&self, id: &str) -> Result<Record> {
        let content = self.raw_record(id)?;
        Record::new(id, content, self.extractor())
    }

    /// Check if a record exists.
    fn exists(&self, id: &str) -> Result<bool> {
        match self.raw_record(id) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// List the ids of all records this backend can serve.
    fn record_ids(&self) -> Result<Vec<String>> {
        Err(StorageError::NotSupported(format!(
            "listing records on '{}' storage",
            self.backend_name()
        )))
    }

    /// Extractor used to populate derived fields.
    fn extractor(&self) -> &RecordExtractor {
        RecordExtractor::standard()
    }

    /// Label distinguishing instances of the same backend type.
    fn instance_id(&self) -> &str;

    /// Registered type name of this backend.
    fn backend_name(&self) -> &'static str;
}

impl std::fmt::Debug for dyn RecordStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordStorage")
            .field("backend", &self.backend_name())
            .field("instance_id", &self.instance_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// In-memory backend exercising the trait defaults.
    struct MapStorage {
        records: HashMap<String, Bytes>,
    }

    impl RecordStorage for MapStorage {
        fn raw_record(&self, id: &str) -> Result<Bytes> {
            self.records
                .get(id)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(id.to_string()))
        }

        fn instance_id(&self) -> &str {
            "map"
        }

        fn backend_name(&self) -> &'static str {
            "memory"
        }
    }

    fn storage() -> MapStorage {
        let mut records = HashMap::new();
        records.insert(
            "dated.xml".to_string(),
            Bytes::from_static(
                b"<XIP><Metadata><Content><PBCoreDescriptionDocument>\
                  <pbcoreInstantiation><pbcoreDateAvailable>\
                  <dateAvailableStart>2021-05-01</dateAvailableStart>\
                  </pbcoreDateAvailable></pbcoreInstantiation>\
                  </PBCoreDescriptionDocument></Content></Metadata></XIP>",
            ),
        );
        records.insert("broken.xml".to_string(), Bytes::from_static(b"<XIP>"));
        MapStorage { records }
    }

    #[test]
    fn test_default_record_uses_standard_extractor() {
        let record = storage().record("dated.xml").unwrap();
        assert_eq!(record.start_date(), Some("2021-05-01"));
    }

    #[test]
    fn test_default_record_propagates_not_found() {
        let err = storage().record("missing.xml").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_default_record_reports_malformed() {
        let err = storage().record("broken.xml").unwrap_err();
        assert!(matches!(err, StorageError::MalformedDocument { .. }));
        // Raw access is unaffected by the parse failure.
        assert!(storage().raw_record("broken.xml").is_ok());
    }

    #[test]
    fn test_default_exists() {
        let storage = storage();
        assert!(storage.exists("dated.xml").unwrap());
        assert!(!storage.exists("missing.xml").unwrap());
    }

    #[test]
    fn test_default_record_ids_not_supported() {
        let err = storage().record_ids().unwrap_err();
        assert!(matches!(err, StorageError::NotSupported(_)));
    }

    #[test]
    fn test_trait_object_debug() {
        let shared: std::sync::Arc<dyn RecordStorage> = std::sync::Arc::new(storage());
        let printed = format!("{:?}", shared);
        assert!(printed.contains("memory"), "{}", printed);
        assert!(printed.contains("map"), "{}", printed);

        let failed: Result<std::sync::Arc<dyn RecordStorage>> =
            Err(StorageError::UnknownType("nope".to_string()));
        assert!(matches!(failed.unwrap_err(), StorageError::UnknownType(_)));
    }
}
