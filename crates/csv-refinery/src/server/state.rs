//! Application state for the refinery server

use std::sync::Arc;

use crate::config::{AppConfig, Credentials, StorageBackend};
use crate::error::{Error, Result};
use crate::processing::CsvProcessor;
use crate::providers::{GeminiClient, LlmProvider};
use crate::storage::{BlobStore, LocalBlobStore, MemoryBlobStore, ResultNaming};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AppConfig,
    /// Batch processor holding the store and model handles
    processor: CsvProcessor,
    /// Upload/result naming convention
    naming: ResultNaming,
}

impl AppState {
    /// Build the store, load credentials and create the Gemini client.
    ///
    /// Missing API key or prompt files fail here, before any request is
    /// served.
    pub async fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            "Initializing refinery state (storage: {:?}, model: {})",
            config.storage.backend,
            config.gemini.model
        );

        let store = build_store(&config).await?;
        let credentials = Credentials::load(&config)?;
        let llm: Arc<dyn LlmProvider> = Arc::new(GeminiClient::from_config(
            &config.gemini,
            credentials.api_key,
        )?);

        tracing::info!(
            "Storage backend {} ready, batch size {}",
            store.name(),
            config.processing.batch_size
        );

        Ok(Self::from_parts(config, store, llm, credentials.prompt))
    }

    /// Assemble state from already-built dependencies
    pub fn from_parts(
        config: AppConfig,
        store: Arc<dyn BlobStore>,
        llm: Arc<dyn LlmProvider>,
        prompt: String,
    ) -> Self {
        let processor = CsvProcessor::from_config(store, llm, prompt, &config.processing);
        let naming = config.storage.result_naming();
        Self {
            inner: Arc::new(AppStateInner {
                config,
                processor,
                naming,
            }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    pub fn processor(&self) -> &CsvProcessor {
        &self.inner.processor
    }

    pub fn store(&self) -> &Arc<dyn BlobStore> {
        self.inner.processor.store()
    }

    pub fn naming(&self) -> &ResultNaming {
        &self.inner.naming
    }
}

/// Create the configured blob store
pub async fn build_store(config: &AppConfig) -> Result<Arc<dyn BlobStore>> {
    match config.storage.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryBlobStore::new())),
        StorageBackend::Local => Ok(Arc::new(LocalBlobStore::new(
            config.storage.local_root.clone(),
        )?)),
        StorageBackend::Gcs => {
            #[cfg(feature = "gcp")]
            {
                let bucket = config.storage.gcs_bucket.clone().ok_or_else(|| {
                    Error::Config("storage.gcs_bucket is required for the gcs backend".to_string())
                })?;
                Ok(Arc::new(crate::storage::GcsBlobStore::new(bucket).await?))
            }
            #[cfg(not(feature = "gcp"))]
            {
                Err(Error::Config(
                    "GCS backend selected but the gcp feature is not enabled".to_string(),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credentials_fail_startup() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Memory;
        config.gemini.api_key_file = dir.path().join("config.ini");
        config.processing.prompt_file = dir.path().join("prompt.txt");

        let result = AppState::new(config).await;
        assert!(matches!(result, Err(Error::ConfigMissing(_))));
    }

    #[tokio::test]
    async fn test_state_from_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ini"), "api_key = k\n").unwrap();
        std::fs::write(dir.path().join("prompt.txt"), "Trim names").unwrap();

        let mut config = AppConfig::default();
        config.storage.backend = StorageBackend::Local;
        config.storage.local_root = dir.path().join("blobs");
        config.gemini.api_key_file = dir.path().join("config.ini");
        config.processing.prompt_file = dir.path().join("prompt.txt");
        config.processing.batch_size = 10;

        let state = AppState::new(config).await.unwrap();
        assert_eq!(state.store().name(), "local-filesystem");
        assert_eq!(state.processor().batch_size(), 10);
        assert!(dir.path().join("blobs").is_dir());
    }
}
