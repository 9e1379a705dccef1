//! Filesystem blob store
//!
//! Object names map to relative paths under a root directory, so
//! `uploads/data.csv` lives at `<root>/uploads/data.csv`. Content types are
//! kept in JSON sidecars under `<root>/.meta/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use super::{BlobInfo, BlobStore};
use crate::error::{Error, Result};

const META_DIR: &str = ".meta";

/// Blob store rooted at a local directory
pub struct LocalBlobStore {
    root: PathBuf,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct BlobMeta {
    content_type: String,
}

impl LocalBlobStore {
    /// Create the store, creating `root` if needed
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Resolve an object name to a path, rejecting names that leave the root
    fn blob_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let valid = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            && !name.starts_with(META_DIR);
        if !valid {
            return Err(Error::BadRequest(format!("Invalid object name: {:?}", name)));
        }
        Ok(self.root.join(relative))
    }

    fn meta_path(&self, name: &str) -> PathBuf {
        self.root.join(META_DIR).join(format!("{}.json", name))
    }

    /// Collect every stored object with its modification time
    fn scan(root: &Path) -> Result<Vec<BlobInfo>> {
        let mut items = Vec::new();
        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.depth() != 1 || e.file_name() != META_DIR)
        {
            let entry = entry.map_err(|e| Error::storage(format!("Failed to scan store: {}", e)))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let modified = entry
                .metadata()
                .map_err(|e| Error::storage(format!("Failed to stat {}: {}", name, e)))?
                .modified()?;
            items.push(BlobInfo {
                name,
                updated: DateTime::<Utc>::from(modified),
            });
        }
        Ok(items)
    }
}

fn not_found_or(name: &str, err: std::io::Error) -> Error {
    if err.kind() == ErrorKind::NotFound {
        Error::NotFound(name.to_string())
    } else {
        Error::Io(err)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, name: &str) -> Result<bool> {
        let path = self.blob_path(name)?;
        Ok(tokio::fs::try_exists(&path).await? && path.is_file())
    }

    async fn read_text(&self, name: &str) -> Result<String> {
        let path = self.blob_path(name)?;
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| not_found_or(name, e))
    }

    async fn write_text(&self, name: &str, content: &str, content_type: &str) -> Result<()> {
        let path = self.blob_path(name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        let meta_path = self.meta_path(name);
        if let Some(parent) = meta_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let meta = BlobMeta {
            content_type: content_type.to_string(),
        };
        tokio::fs::write(&meta_path, serde_json::to_vec(&meta)?).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<BlobInfo>> {
        let root = self.root.clone();
        let mut items = tokio::task::spawn_blocking(move || Self::scan(&root))
            .await
            .map_err(|e| Error::Internal(format!("Task join error: {}", e)))??;
        items.retain(|b| b.name.starts_with(prefix));
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let path = self.blob_path(name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| not_found_or(name, e))?;
        // Sidecar may be missing for files dropped into the directory by hand
        let _ = tokio::fs::remove_file(self.meta_path(name)).await;
        Ok(())
    }

    fn name(&self) -> &str {
        "local-filesystem"
    }
}

impl LocalBlobStore {
    /// Content type recorded when the object was written
    pub async fn content_type(&self, name: &str) -> Result<Option<String>> {
        match tokio::fs::read(self.meta_path(name)).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice::<BlobMeta>(&bytes)?.content_type)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CSV_CONTENT_TYPE;

    #[tokio::test]
    async fn test_roundtrip_nested_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).unwrap();

        store
            .write_text("uploads/data.csv", "\u{feff}a,b\n1,2", CSV_CONTENT_TYPE)
            .await
            .unwrap();

        assert!(dir.path().join("uploads").join("data.csv").is_file());
        assert!(store.exists("uploads/data.csv").await.unwrap());
        assert_eq!(
            store.read_text("uploads/data.csv").await.unwrap(),
            "\u{feff}a,b\n1,2"
        );
        assert_eq!(
            store.content_type("uploads/data.csv").await.unwrap().as_deref(),
            Some("text/csv")
        );
    }

    #[tokio::test]
    async fn test_list_skips_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).unwrap();
        store.write_text("uploads/b.csv", "h", CSV_CONTENT_TYPE).await.unwrap();
        store.write_text("uploads/a.csv", "h", CSV_CONTENT_TYPE).await.unwrap();
        store.write_text("outputs/a.csv", "h", CSV_CONTENT_TYPE).await.unwrap();

        let all = store.list("").await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|b| !b.name.starts_with(".meta")));

        let uploads: Vec<String> = store
            .list("uploads/")
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name)
            .collect();
        assert_eq!(uploads, vec!["uploads/a.csv", "uploads/b.csv"]);
    }

    #[tokio::test]
    async fn test_missing_and_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).unwrap();

        assert!(!store.exists("outputs/x.csv").await.unwrap());
        assert!(matches!(
            store.read_text("outputs/x.csv").await,
            Err(Error::NotFound(_))
        ));

        store.write_text("outputs/x.csv", "h", CSV_CONTENT_TYPE).await.unwrap();
        store.delete("outputs/x.csv").await.unwrap();
        assert!(!store.exists("outputs/x.csv").await.unwrap());
        assert!(matches!(store.delete("outputs/x.csv").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path()).unwrap();

        for name in ["../etc/passwd", "/abs.csv", "uploads/../../x.csv", "", ".meta/x.json"] {
            let result = store.write_text(name, "h", CSV_CONTENT_TYPE).await;
            assert!(matches!(result, Err(Error::BadRequest(_))), "{name:?}");
        }
    }
}
