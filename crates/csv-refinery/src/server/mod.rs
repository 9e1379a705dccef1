//! HTTP server for the CSV refinery

pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::Result;
use crate::storage::{sweep_expired, BlobStore, ResultNaming};
use state::AppState;

/// Refinery HTTP server
pub struct RefineryServer {
    config: AppConfig,
    state: AppState,
}

impl RefineryServer {
    /// Create a new server, loading credentials and opening the store
    pub async fn new(config: AppConfig) -> Result<Self> {
        let state = AppState::new(config.clone()).await?;
        Ok(Self { config, state })
    }

    /// Create from prepared state
    pub fn with_state(state: AppState) -> Self {
        Self {
            config: state.config().clone(),
            state,
        }
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let router = Router::new()
            // Health check
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            // API routes with body limit for multipart uploads
            .nest("/api", routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            // Middleware layers (order matters - applied bottom to top)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new());

        if self.config.server.enable_cors {
            router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
        } else {
            router
        }
    }

    /// Start the server and the background retention sweep
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| crate::error::Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();
        let sweeper = spawn_retention_sweep(
            self.state.store().clone(),
            self.state.naming().clone(),
            self.config.storage.retention(),
            Duration::from_secs(self.config.storage.cleanup_interval_secs),
        );

        tracing::info!("Starting CSV refinery on http://{}", addr);
        tracing::info!("API documentation: http://{}/api/info", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::Error::Config(format!("Failed to bind: {}", e)))?;

        let served = axum::serve(listener, router)
            .await
            .map_err(|e| crate::error::Error::Internal(format!("Server error: {}", e)));

        if let Some(handle) = sweeper {
            handle.abort();
        }
        served
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Run `sweep_expired` every `interval` until the task is aborted.
///
/// Returns `None` when either the interval or the retention is zero, which
/// disables the sweep.
pub fn spawn_retention_sweep(
    store: Arc<dyn BlobStore>,
    naming: ResultNaming,
    retention: Duration,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if interval.is_zero() || retention.is_zero() {
        tracing::info!("Retention sweep disabled");
        return None;
    }

    tracing::info!(
        "Retention sweep every {:?}, removing objects older than {:?} ({:?})",
        interval,
        retention,
        naming
    );

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = sweep_expired(store.as_ref(), &naming, retention, Utc::now()).await {
                tracing::warn!("Retention sweep failed: {}", e);
            }
        }
    }))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Readiness check endpoint
async fn readiness(
    state: axum::extract::State<AppState>,
) -> (axum::http::StatusCode, axum::Json<serde_json::Value>) {
    (
        axum::http::StatusCode::OK,
        axum::Json(serde_json::json!({
            "status": "ready",
            "storage": state.store().name(),
            "batch_size": state.processor().batch_size(),
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::routes::test_support::{body_json, body_text, send, state_with};
    use crate::storage::{MemoryBlobStore, CSV_CONTENT_TYPE};
    use crate::testing::FakeLlm;
    use axum::{body::Body, http::Request, http::StatusCode};

    #[tokio::test]
    async fn test_health_and_ready() {
        let (state, _store) = state_with(FakeLlm::echo());
        let server = RefineryServer::with_state(state);

        let health = send(
            server.build_router(),
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(health.status(), StatusCode::OK);
        assert_eq!(body_text(health).await, "OK");

        let ready = send(
            server.build_router(),
            Request::get("/ready").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(ready.status(), StatusCode::OK);
        let body = body_json(ready).await;
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["batch_size"], 2000);
    }

    #[tokio::test]
    async fn test_info_lists_endpoints() {
        let (state, _store) = state_with(FakeLlm::echo());
        let server = RefineryServer::with_state(state);
        let response = send(
            server.build_router(),
            Request::get("/api/info").body(Body::empty()).unwrap(),
        )
        .await;

        let body = body_json(response).await;
        assert_eq!(body["name"], "csv-refinery");
        assert!(body["endpoints"]["POST /api/upload"].is_string());
    }

    #[test]
    fn test_address() {
        let (state, _store) = state_with(FakeLlm::echo());
        let server = RefineryServer::with_state(state);
        assert_eq!(server.address(), "0.0.0.0:8080");
    }

    #[tokio::test]
    async fn test_zero_interval_disables_sweep() {
        let store: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        assert!(
            spawn_retention_sweep(store, ResultNaming::Suffix, Duration::from_secs(60), Duration::ZERO)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_sweep_task_removes_expired() {
        let store = Arc::new(MemoryBlobStore::new());
        store.write_text("uploads/old.csv", "a", CSV_CONTENT_TYPE).await.unwrap();
        store
            .set_updated("uploads/old.csv", Utc::now() - chrono::Duration::hours(2))
            .unwrap();

        let handle = spawn_retention_sweep(
            store.clone(),
            ResultNaming::Prefixed {
                uploads_prefix: "uploads/".to_string(),
                outputs_prefix: "outputs/".to_string(),
            },
            Duration::from_secs(3600),
            Duration::from_millis(10),
        )
        .unwrap();

        // First tick fires immediately
        for _ in 0..50 {
            if store.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_flat_sweep_task_keeps_unrelated_objects() {
        let store = Arc::new(MemoryBlobStore::new());
        let old = Utc::now() - chrono::Duration::hours(48);
        for name in ["data.csv", "data_result.csv", "README.md", "backups/ledger.xlsx"] {
            store.write_text(name, "a", CSV_CONTENT_TYPE).await.unwrap();
            store.set_updated(name, old).unwrap();
        }

        let handle = spawn_retention_sweep(
            store.clone(),
            ResultNaming::Suffix,
            Duration::from_secs(24 * 3600),
            Duration::from_millis(10),
        )
        .unwrap();

        for _ in 0..50 {
            if store.len() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();

        assert!(!store.exists("data.csv").await.unwrap());
        assert!(!store.exists("data_result.csv").await.unwrap());
        assert!(store.exists("README.md").await.unwrap());
        assert!(store.exists("backups/ledger.xlsx").await.unwrap());
    }
}
