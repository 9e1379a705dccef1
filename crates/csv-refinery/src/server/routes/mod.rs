//! API routes for the refinery server

pub mod files;
pub mod process;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Upload and process in one step, with larger body limit
        .route(
            "/upload",
            post(files::upload_csv).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Re-run on an object already in storage
        .route("/process", post(process::process_existing))
        // Results
        .route("/results", get(files::list_results))
        .route("/download/*name", get(files::download))
        .route("/files/*name", delete(files::delete_file))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "csv-refinery",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Batch CSV cleaning through the Gemini API",
        "endpoints": {
            "POST /api/upload": "Upload a .csv file (multipart field `file`) and process it",
            "POST /api/process": "Process an existing object: {input, output?}",
            "GET /api/results": "List inputs that have a finished result",
            "GET /api/download/*name": "Download a stored CSV",
            "DELETE /api/files/*name": "Delete a stored object"
        }
    }))
}
