//! In-process blob store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;

use super::{BlobInfo, BlobStore};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
struct StoredBlob {
    content: String,
    content_type: String,
    updated: DateTime<Utc>,
}

/// Blob store backed by a concurrent map; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, StoredBlob>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Content type recorded for an object, if present
    pub fn content_type(&self, name: &str) -> Option<String> {
        self.blobs.get(name).map(|b| b.content_type.clone())
    }

    /// Override the modification time of an object
    pub fn set_updated(&self, name: &str, updated: DateTime<Utc>) -> Result<()> {
        let mut blob = self
            .blobs
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        blob.updated = updated;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.blobs.contains_key(name))
    }

    async fn read_text(&self, name: &str) -> Result<String> {
        self.blobs
            .get(name)
            .map(|b| b.content.clone())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    async fn write_text(&self, name: &str, content: &str, content_type: &str) -> Result<()> {
        self.blobs.insert(
            name.to_string(),
            StoredBlob {
                content: content.to_string(),
                content_type: content_type.to_string(),
                updated: Utc::now(),
            },
        );
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>> {
        let mut items: Vec<BlobInfo> = self
            .blobs
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| BlobInfo {
                name: entry.key().clone(),
                updated: entry.value().updated,
            })
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.blobs
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CSV_CONTENT_TYPE;

    #[tokio::test]
    async fn test_write_read_overwrite() {
        let store = MemoryBlobStore::new();
        assert!(!store.exists("uploads/a.csv").await.unwrap());

        store.write_text("uploads/a.csv", "x,y\n1,2", CSV_CONTENT_TYPE).await.unwrap();
        assert!(store.exists("uploads/a.csv").await.unwrap());
        assert_eq!(store.read_text("uploads/a.csv").await.unwrap(), "x,y\n1,2");
        assert_eq!(store.content_type("uploads/a.csv").as_deref(), Some("text/csv"));

        store.write_text("uploads/a.csv", "x,y", CSV_CONTENT_TYPE).await.unwrap();
        assert_eq!(store.read_text("uploads/a.csv").await.unwrap(), "x,y");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found() {
        let store = MemoryBlobStore::new();
        assert!(matches!(store.read_text("nope").await, Err(Error::NotFound(_))));
        assert!(matches!(store.delete("nope").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_by_prefix_sorted() {
        let store = MemoryBlobStore::new();
        for name in ["outputs/b.csv", "uploads/b.csv", "uploads/a.csv"] {
            store.write_text(name, "h", CSV_CONTENT_TYPE).await.unwrap();
        }

        let names: Vec<String> = store
            .list("uploads/")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(names, vec!["uploads/a.csv", "uploads/b.csv"]);
        assert_eq!(store.list("").await.unwrap().len(), 3);

        store.delete("uploads/a.csv").await.unwrap();
        assert_eq!(store.list("uploads/").await.unwrap().len(), 1);
    }
}
