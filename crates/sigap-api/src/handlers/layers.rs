//! Layer read-back, used to verify an upload landed.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use sigap_core::LayerName;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct LayerInfo {
    pub name: LayerName,
    pub feature_count: i64,
}

/// `GET /layers/:name`
///
/// # Returns
/// - 200 OK with the sanitized name and its feature count
/// - 400 Bad Request if the name cannot form a valid identifier
/// - 500 Internal Server Error on store failure, including a missing table
pub async fn layer_info(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<LayerInfo>, ApiError> {
    let name = LayerName::sanitize(&name)?;
    let feature_count = state.store.feature_count(&name).await?;
    Ok(Json(LayerInfo {
        name,
        feature_count,
    }))
}
