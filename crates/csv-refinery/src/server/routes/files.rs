//! Upload, listing, download and delete endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::processing::ProcessReport;
use crate::server::state::AppState;
use crate::storage::{ProcessedFile, CSV_CONTENT_TYPE};

/// Multipart field carrying the uploaded file
const FILE_FIELD: &str = "file";

/// POST /api/upload - Store a CSV upload and process it right away
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ProcessReport>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::BadRequest(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().map(base_name).unwrap_or_default();
        if filename.is_empty() {
            return Err(Error::BadRequest("No file selected".to_string()));
        }
        if !filename.ends_with(".csv") {
            return Err(Error::BadRequest(format!(
                "Only .csv files are accepted, got {}",
                filename
            )));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("Failed to read file: {}", e)))?;
        let text = String::from_utf8(data.to_vec())
            .map_err(|_| Error::BadRequest(format!("{} is not valid UTF-8", filename)))?;

        let input = state.naming().upload_name(&filename);
        let output = state.naming().output_name(&input);
        tracing::info!("Upload {} ({} bytes) stored as {}", filename, text.len(), input);

        state
            .store()
            .write_text(&input, &text, CSV_CONTENT_TYPE)
            .await?;
        let report = state.processor().process(&input, &output).await?;
        return Ok(Json(report));
    }

    Err(Error::BadRequest(format!(
        "Request has no `{}` field",
        FILE_FIELD
    )))
}

/// GET /api/results - Inputs that have a finished result
pub async fn list_results(State(state): State<AppState>) -> Result<Json<Vec<ProcessedFile>>> {
    let files = state.naming().processed_files(state.store().as_ref()).await?;
    Ok(Json(files))
}

/// GET /api/download/*name - Stored CSV as an attachment
pub async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse> {
    let content = state.store().read_text(&name).await?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        base_name(&name).replace('"', "_")
    );

    Ok((
        [
            (header::CONTENT_TYPE, format!("{}; charset=utf-8", CSV_CONTENT_TYPE)),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        content,
    ))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub deleted: String,
}

/// DELETE /api/files/*name - Remove a stored object
pub async fn delete_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteResponse>> {
    state.store().delete(&name).await?;
    tracing::info!("Deleted {}", name);
    Ok(Json(DeleteResponse { deleted: name }))
}

/// Last path segment of a client-supplied name
fn base_name(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or("").trim().to_string()
}
