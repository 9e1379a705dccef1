//! Blob store façade over the object storage that holds uploads and results
//!
//! The processor only needs existence checks, whole-object text reads and
//! writes, prefix listing with modification times, and deletes. Backends:
//! - `MemoryBlobStore`: in-process map
//! - `LocalBlobStore`: directory on disk
//! - `GcsBlobStore`: Google Cloud Storage bucket (`gcp` feature)

mod cleanup;
mod local;
mod memory;
mod naming;

#[cfg(feature = "gcp")]
mod gcs;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;

pub use cleanup::sweep_expired;
pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use naming::{ProcessedFile, ResultNaming};

#[cfg(feature = "gcp")]
pub use gcs::GcsBlobStore;

/// Content type used for every CSV object we write
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Listing entry for a stored object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlobInfo {
    /// Full object name, including prefix
    pub name: String,
    /// Last modification time reported by the backend
    pub updated: DateTime<Utc>,
}

/// Object store operations used by the refinery.
///
/// Each call is an independent round trip; there are no transactions and
/// no caching.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check whether an object exists
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Read a whole object as UTF-8 text.
    ///
    /// Fails with `Error::NotFound` if the object is absent.
    async fn read_text(&self, name: &str) -> Result<String>;

    /// Create or overwrite an object
    async fn write_text(&self, name: &str, content: &str, content_type: &str) -> Result<()>;

    /// List objects whose name starts with `prefix`, sorted by name
    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>>;

    /// Delete an object. Fails with `Error::NotFound` if absent.
    async fn delete(&self, name: &str) -> Result<()>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
