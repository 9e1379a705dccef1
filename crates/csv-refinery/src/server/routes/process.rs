//! Processing endpoint for objects already in storage

use axum::{extract::State, Json};
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::processing::ProcessReport;
use crate::server::state::AppState;

/// Request body for POST /api/process
#[derive(Debug, Deserialize)]
pub struct ProcessRequest {
    /// Input object name
    pub input: String,
    /// Output object name; derived from `input` when omitted
    #[serde(default)]
    pub output: Option<String>,
}

/// POST /api/process - Run the batch pipeline on a stored object
pub async fn process_existing(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessReport>> {
    if request.input.trim().is_empty() {
        return Err(Error::BadRequest("input must not be empty".to_string()));
    }

    let output = request
        .output
        .filter(|o| !o.trim().is_empty())
        .unwrap_or_else(|| state.naming().output_name(&request.input));
    if output == request.input {
        return Err(Error::BadRequest(
            "output must differ from input".to_string(),
        ));
    }

    let report = state.processor().process(&request.input, &output).await?;
    Ok(Json(report))
}
