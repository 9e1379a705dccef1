//! Configuration for the CSV refinery

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::storage::ResultNaming;

/// Main refinery configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Gemini API configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Batch processing configuration
    #[serde(default)]
    pub processing: ProcessingConfig,
    /// Object storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigMissing(format!("Failed to read config {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.processing.batch_size == 0 {
            return Err(Error::Config("processing.batch_size must be at least 1".to_string()));
        }
        if self.storage.naming == NamingScheme::Prefixed
            && (self.storage.uploads_prefix.is_empty() || self.storage.outputs_prefix.is_empty())
        {
            return Err(Error::Config(
                "storage.uploads_prefix and storage.outputs_prefix must not be empty with prefixed naming"
                    .to_string(),
            ));
        }
        if self.storage.backend == StorageBackend::Gcs && self.storage.gcs_bucket.is_none() {
            return Err(Error::Config(
                "storage.gcs_bucket is required for the gcs backend".to_string(),
            ));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Gemini `generateContent` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API root, without version segment
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Model name (default: "gemini-2.5-flash-lite")
    #[serde(default = "default_gemini_model")]
    pub model: String,
    /// Per-call network timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Key/value file holding an `api_key = ...` line
    #[serde(default = "default_api_key_file")]
    pub api_key_file: PathBuf,
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash-lite".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_api_key_file() -> PathBuf {
    PathBuf::from("config.ini")
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            timeout_secs: default_timeout_secs(),
            api_key_file: default_api_key_file(),
        }
    }
}

impl GeminiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Batch processing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    /// Maximum data rows per API call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause after a failed batch, in milliseconds
    #[serde(default = "default_failure_pause_ms")]
    pub failure_pause_ms: u64,
    /// Free-form instructions sent with every batch
    #[serde(default = "default_prompt_file")]
    pub prompt_file: PathBuf,
}

fn default_batch_size() -> usize {
    2000
}

fn default_failure_pause_ms() -> u64 {
    1000
}

fn default_prompt_file() -> PathBuf {
    PathBuf::from("prompt.txt")
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            failure_pause_ms: default_failure_pause_ms(),
            prompt_file: default_prompt_file(),
        }
    }
}

impl ProcessingConfig {
    pub fn failure_pause(&self) -> Duration {
        Duration::from_millis(self.failure_pause_ms)
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// In-process map, lost on restart
    Memory,
    /// Directory on the local filesystem
    #[default]
    Local,
    /// Google Cloud Storage bucket
    Gcs,
}

/// Object storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Root directory for the local backend
    #[serde(default = "default_local_root")]
    pub local_root: PathBuf,
    /// Bucket name for the gcs backend
    #[serde(default)]
    pub gcs_bucket: Option<String>,
    /// Prefix for uploaded inputs (default: "uploads/")
    #[serde(default = "default_uploads_prefix")]
    pub uploads_prefix: String,
    /// Prefix for processed outputs (default: "outputs/")
    #[serde(default = "default_outputs_prefix")]
    pub outputs_prefix: String,
    /// How result names are derived from input names
    #[serde(default)]
    pub naming: NamingScheme,
    /// Objects older than this are removed by the retention sweep
    #[serde(default = "default_retention_hours")]
    pub retention_hours: u64,
    /// Interval between retention sweeps in the server
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_local_root() -> PathBuf {
    PathBuf::from("data")
}

fn default_uploads_prefix() -> String {
    "uploads/".to_string()
}

fn default_outputs_prefix() -> String {
    "outputs/".to_string()
}

fn default_retention_hours() -> u64 {
    24
}

fn default_cleanup_interval_secs() -> u64 {
    3600
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            local_root: default_local_root(),
            gcs_bucket: None,
            uploads_prefix: default_uploads_prefix(),
            outputs_prefix: default_outputs_prefix(),
            naming: NamingScheme::default(),
            retention_hours: default_retention_hours(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

/// Result naming scheme selection
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NamingScheme {
    /// `uploads/data.csv` -> `outputs/data.csv`
    #[default]
    Prefixed,
    /// `data.csv` -> `data_result.csv`, flat bucket
    Suffix,
}

impl StorageConfig {
    /// Build the naming convention for this deployment
    pub fn result_naming(&self) -> ResultNaming {
        match self.naming {
            NamingScheme::Prefixed => ResultNaming::Prefixed {
                uploads_prefix: self.uploads_prefix.clone(),
                outputs_prefix: self.outputs_prefix.clone(),
            },
            NamingScheme::Suffix => ResultNaming::Suffix,
        }
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours * 3600)
    }
}

/// Secrets and prompt text read from side files
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub prompt: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("prompt_len", &self.prompt.len())
            .finish()
    }
}

impl Credentials {
    /// Read the API key file and the prompt file named in `config`
    pub fn load(config: &AppConfig) -> Result<Self> {
        let api_key = load_api_key(&config.gemini.api_key_file)?;
        let prompt = read_prompt(&config.processing.prompt_file)?;
        Ok(Self { api_key, prompt })
    }
}

/// Read `api_key` from a `config.ini`-style file.
///
/// The first line whose key starts with `api_key` (case-insensitive) wins;
/// everything after the first `=` is the value.
pub fn load_api_key(path: &Path) -> Result<String> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::ConfigMissing(format!("Failed to read API key file {}: {}", path.display(), e))
    })?;
    parse_api_key(&content).ok_or_else(|| {
        Error::ConfigMissing(format!("No api_key entry in {}", path.display()))
    })
}

fn parse_api_key(content: &str) -> Option<String> {
    content
        .lines()
        .map(str::trim)
        .find(|line| line.to_lowercase().starts_with("api_key"))
        .and_then(|line| line.split_once('='))
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Read the prompt text, trimmed
pub fn read_prompt(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            Error::ConfigMissing(format!("Failed to read prompt file {}: {}", path.display(), e))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_api_key() {
        let ini = "[gemini]\n  API_KEY = abc123 \nother=1\n";
        assert_eq!(parse_api_key(ini), Some("abc123".to_string()));

        assert_eq!(parse_api_key("api_key=k=v"), Some("k=v".to_string()));
        assert_eq!(parse_api_key("token = nope"), None);
        assert_eq!(parse_api_key("api_key ="), None);
        assert_eq!(parse_api_key("api_key"), None);
    }

    #[test]
    fn test_credentials_load() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("config.ini");
        let prompt_path = dir.path().join("prompt.txt");
        std::fs::write(&key_path, "api_key = secret\n").unwrap();
        std::fs::write(&prompt_path, "\n  Normalize phone numbers.\n\n").unwrap();

        let mut config = AppConfig::default();
        config.gemini.api_key_file = key_path;
        config.processing.prompt_file = prompt_path;

        let creds = Credentials::load(&config).unwrap();
        assert_eq!(creds.api_key, "secret");
        assert_eq!(creds.prompt, "Normalize phone numbers.");
        assert!(!format!("{:?}", creds).contains("secret"));
    }

    #[test]
    fn test_missing_files_are_config_missing() {
        let mut config = AppConfig::default();
        config.gemini.api_key_file = PathBuf::from("/nonexistent/config.ini");
        let err = Credentials::load(&config).unwrap_err();
        assert!(matches!(err, Error::ConfigMissing(_)));
    }

    #[test]
    fn test_toml_defaults_and_validation() {
        let config: AppConfig = toml::from_str(
            r#"
            [processing]
            batch_size = 50

            [storage]
            backend = "memory"
            naming = "suffix"
            "#,
        )
        .unwrap();
        assert_eq!(config.processing.batch_size, 50);
        assert_eq!(config.processing.failure_pause_ms, 1000);
        assert_eq!(config.gemini.model, "gemini-2.5-flash-lite");
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.result_naming(), ResultNaming::Suffix);
        assert!(config.validate().is_ok());

        let mut bad = config.clone();
        bad.processing.batch_size = 0;
        assert!(matches!(bad.validate(), Err(Error::Config(_))));

        let mut gcs = config;
        gcs.storage.backend = StorageBackend::Gcs;
        assert!(gcs.validate().is_err());
    }

    #[test]
    fn test_prefixed_naming_requires_prefixes() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.storage.uploads_prefix = String::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        // Flat naming never lists by prefix
        config.storage.naming = NamingScheme::Suffix;
        assert!(config.validate().is_ok());
    }
}
