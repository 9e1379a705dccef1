//! Retention sweep for uploads and results

use chrono::{DateTime, Utc};
use std::time::Duration;

use super::{BlobStore, ResultNaming};
use crate::error::{Error, Result};

/// Delete every object owned by `naming` that was last modified more than
/// `max_age` before `now`.
///
/// Objects the naming scheme does not claim are never touched. Returns the
/// deleted names. A failed delete is logged and skipped; a failed listing
/// aborts the sweep.
pub async fn sweep_expired(
    store: &dyn BlobStore,
    naming: &ResultNaming,
    max_age: Duration,
    now: DateTime<Utc>,
) -> Result<Vec<String>> {
    let max_age = chrono::Duration::from_std(max_age)
        .map_err(|e| Error::Config(format!("Retention out of range: {}", e)))?;
    let cutoff = now - max_age;

    let mut deleted = Vec::new();
    for blob in naming.owned_objects(store).await? {
        if blob.updated >= cutoff {
            continue;
        }
        match store.delete(&blob.name).await {
            Ok(()) => {
                tracing::debug!("Deleted expired object {}", blob.name);
                deleted.push(blob.name);
            }
            // Someone else removed it between list and delete
            Err(Error::NotFound(_)) => {}
            Err(e) => tracing::warn!("Failed to delete expired object {}: {}", blob.name, e),
        }
    }

    if !deleted.is_empty() {
        tracing::info!(
            "Retention sweep on {} removed {} object(s)",
            store.name(),
            deleted.len()
        );
    }
    Ok(deleted)
}
