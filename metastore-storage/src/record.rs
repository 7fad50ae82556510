//! Records returned by storage backends.

use bytes::Bytes;
use chrono::NaiveDate;

use crate::error::{Result, StorageError};
use crate::extract::{DerivedFields, RecordExtractor, START_DATE_FIELD};

/// An immutable metadata record: id, raw XML content and derived fields.
///
/// Derived fields are computed once, when the record is constructed, and
/// never recomputed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    id: String,
    content: Bytes,
    derived: DerivedFields,
}

impl Record {
    /// Build a record, running `extractor` over the raw content.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::MalformedDocument` if the content cannot be
    /// parsed. A field whose path is absent is not an error.
    pub fn new(id: impl Into<String>, content: Bytes, extractor: &RecordExtractor) -> Result<Self> {
        let id = id.into();
        let derived = extractor
            .extract(&content)
            .map_err(|e| StorageError::MalformedDocument {
                id: id.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            content,
            derived,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw record content, byte-identical to what the backend read.
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// Content as UTF-8 text, if it is valid UTF-8.
    pub fn content_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.content).ok()
    }

    pub fn into_content(self) -> Bytes {
        self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn derived_fields(&self) -> &DerivedFields {
        &self.derived
    }

    /// Value of a derived field, `None` if its path was never matched.
    pub fn derived(&self, name: &str) -> Option<&str> {
        self.derived.get(name).map(String::as_str)
    }

    /// Raw text of the availability start date.
    pub fn start_date(&self) -> Option<&str> {
        self.derived(START_DATE_FIELD)
    }

    /// Availability start date parsed as `YYYY-MM-DD`.
    ///
    /// `None` if the field is absent or not a plain calendar date.
    pub fn available_from(&self) -> Option<NaiveDate> {
        self.start_date()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "<XIP><Metadata><Content><PBCoreDescriptionDocument>\
        <pbcoreInstantiation><pbcoreDateAvailable>\
        <dateAvailableStart>2021-05-01</dateAvailableStart>\
        </pbcoreDateAvailable></pbcoreInstantiation>\
        </PBCoreDescriptionDocument></Content></Metadata></XIP>";

    #[test]
    fn test_record_derives_start_date() {
        let record = Record::new("a.xml", Bytes::from_static(DOC.as_bytes()), RecordExtractor::standard())
            .unwrap();

        assert_eq!(record.id(), "a.xml");
        assert_eq!(record.start_date(), Some("2021-05-01"));
        assert_eq!(
            record.available_from(),
            NaiveDate::from_ymd_opt(2021, 5, 1)
        );
        assert_eq!(record.content_str(), Some(DOC));
        assert_eq!(record.len(), DOC.len());
    }

    #[test]
    fn test_record_without_date() {
        let record = Record::new(
            "b.xml",
            Bytes::from_static(b"<XIP><Metadata/></XIP>"),
            RecordExtractor::standard(),
        )
        .unwrap();

        assert!(record.derived_fields().is_empty());
        assert_eq!(record.start_date(), None);
        assert_eq!(record.available_from(), None);
    }

    #[test]
    fn test_unparseable_date_keeps_raw_text() {
        let doc = DOC.replace("2021-05-01", "spring 2021");
        let record = Record::new("c.xml", Bytes::from(doc), RecordExtractor::standard()).unwrap();

        assert_eq!(record.start_date(), Some("spring 2021"));
        assert_eq!(record.available_from(), None);
    }

    #[test]
    fn test_malformed_content() {
        let result = Record::new(
            "broken.xml",
            Bytes::from_static(b"<XIP><Metadata></XIP>"),
            RecordExtractor::standard(),
        );

        match result {
            Err(StorageError::MalformedDocument { id, .. }) => assert_eq!(id, "broken.xml"),
            other => panic!("expected MalformedDocument, got {:?}", other),
        }
    }
}
