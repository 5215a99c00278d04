//! Shapefile archive upload.

use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use sigap_core::LayerName;

use crate::{ApiError, AppState};

/// Multipart field names accepted for the archive.
const ARCHIVE_FIELDS: [&str; 2] = ["shpzip", "file"];

const NO_FILE: &str = "No file uploaded";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub ok: bool,
    pub message: String,
    pub table: LayerName,
}

/// `POST /upload`
///
/// # Multipart Fields
/// - `shpzip` or `file`: ZIP archive containing a `.shp` and its sidecars
///
/// The archive is streamed into a per-request workspace that is removed
/// when the request finishes, fails, or is cancelled.
///
/// # Returns
/// - 200 OK with the table the layer was imported to
/// - 400 Bad Request if the body is not multipart or has no archive field
/// - 500 Internal Server Error for any pipeline failure
pub async fn upload_layer(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        debug!(subsystem = "api", component = "upload", error = %e, "Rejected non-multipart upload");
        ApiError::BadRequest(NO_FILE.to_string())
    })?;

    let workspace = state
        .ingest
        .allocate_workspace()
        .await
        .map_err(ApiError::internal)?;

    let mut received: Option<u64> = None;
    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read upload: {}", e)))?
    {
        if !field
            .name()
            .is_some_and(|name| ARCHIVE_FIELDS.contains(&name))
        {
            continue;
        }

        debug!(
            subsystem = "api",
            component = "upload",
            workspace_id = %workspace.id(),
            file_name = field.file_name().unwrap_or("(none)"),
            "Receiving archive"
        );

        let mut file = tokio::fs::File::create(workspace.archive_path())
            .await
            .map_err(ApiError::internal)?;
        let mut written: u64 = 0;
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read file data: {}", e)))?
        {
            file.write_all(&chunk).await.map_err(ApiError::internal)?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(ApiError::internal)?;
        received = Some(written);
        break;
    }

    let Some(archive_bytes) = received else {
        return Err(ApiError::BadRequest(NO_FILE.to_string()));
    };

    let outcome = state
        .ingest
        .ingest(Arc::new(workspace))
        .await
        .map_err(ApiError::internal)?;

    info!(
        subsystem = "api",
        component = "upload",
        db_table = %outcome.table,
        archive_bytes,
        "Upload imported"
    );

    Ok(Json(UploadResponse {
        ok: true,
        message: format!("Imported to table {}", outcome.table),
        table: outcome.table,
    }))
}
