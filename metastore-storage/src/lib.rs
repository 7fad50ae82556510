//! Read-only metadata record retrieval over pluggable storage backends.
//!
//! Backends implement the [`RecordStorage`] trait. Each lookup returns a
//! [`Record`]: the raw XML content plus derived fields pulled out of it by a
//! streaming [`RecordExtractor`] in a single pass.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  configuration (YAML)                        │
//! └──────────────────────┬───────────────────────┘
//!                        ▼
//!              ┌───────────────────┐
//!              │ StorageController │
//!              └─────────┬─────────┘
//!                        ▼
//!              ┌───────────────────┐
//!              │  BackendRegistry  │  type name → constructor
//!              └─────────┬─────────┘
//!                        ▼
//!              ┌───────────────────┐
//!              │   RecordStorage   │  ← Unified trait
//!              └─────────┬─────────┘
//!           ┌────────────┴────────────┐
//!           ▼                         ▼
//!    ┌──────────────┐          ┌──────────────┐
//!    │    Folder    │          │    Multi     │
//!    └──────┬───────┘          └──────────────┘
//!           ▼
//!    raw bytes ──► RecordExtractor ──► Record
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use metastore_storage::{BackendConfig, RecordStorage, StorageController};
//!
//! # fn example() -> metastore_storage::Result<()> {
//! let config = BackendConfig::new("folder")
//!     .with_id("main")
//!     .with_option("root", "./records")
//!     .with_option("cache", true);
//!
//! let storage = StorageController::default().create_storage(&config)?;
//!
//! let record = storage.record("henrik-hertz.xml")?;
//! println!("{} available from {:?}", record.id(), record.start_date());
//! # Ok(())
//! # }
//! ```
//!
//! # Backend types
//!
//! - `folder` - files under a root directory, optionally recursive and cached

mod cache;
mod config;
mod controller;
mod error;
mod extract;
mod folder;
mod multi;
mod record;
mod registry;
mod traits;

pub use cache::{CacheStats, RecordCache};
pub use config::{expand_tilde, BackendConfig, StorageSection};
pub use controller::StorageController;
pub use error::{Result, StorageError};
pub use extract::{
    DerivedField, DerivedFields, ElementPath, ExtractError, RecordExtractor, START_DATE_FIELD,
    START_DATE_PATH,
};
pub use folder::{FolderConfig, FolderStorage, FOLDER_TYPE};
pub use multi::{MultiStorage, MULTI_TYPE};
pub use record::Record;
pub use registry::{BackendConstructor, BackendRegistry};
pub use traits::RecordStorage;

// Re-export bytes for convenience
pub use bytes::Bytes;
