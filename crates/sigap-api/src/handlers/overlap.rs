//! Pairwise overlap between two stored layers.

use std::time::Instant;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::{debug, info};

use sigap_core::{Error, FeatureCollection, OverlapRequest};

use crate::{ApiError, AppState};

/// Raw query string; every parameter is optional.
#[derive(Debug, Default, Deserialize)]
pub struct OverlapQuery {
    /// `minx,miny,maxx,maxy`
    pub bbox: Option<String>,
    pub layer1: Option<String>,
    pub layer2: Option<String>,
}

/// `GET /overlap?bbox=minx,miny,maxx,maxy&layer1=<id>&layer2=<id>`
///
/// Omitted layers fall back to the configured defaults. A malformed `bbox`
/// is ignored rather than rejected.
///
/// # Returns
/// - 200 OK with a GeoJSON `FeatureCollection` (possibly empty)
/// - 400 Bad Request if a layer name fails validation
/// - 500 Internal Server Error on query failure
pub async fn overlap(
    State(state): State<AppState>,
    Query(query): Query<OverlapQuery>,
) -> Result<Json<FeatureCollection>, ApiError> {
    let start = Instant::now();
    let request = OverlapRequest::resolve(
        query.layer1.as_deref(),
        query.layer2.as_deref(),
        query.bbox.as_deref(),
        &state.overlap_defaults,
    )
    .map_err(|e| match e {
        Error::InvalidIdentifier(_) => ApiError::BadRequest("Invalid table names".to_string()),
        other => ApiError::from(other),
    })?;

    debug!(
        subsystem = "api",
        component = "overlap",
        layer1 = %request.layer1,
        layer2 = %request.layer2,
        bbox = ?request.bbox,
        "Resolved overlap request"
    );

    let rows = state.store.overlap_pairs(&request).await?;
    let collection = FeatureCollection::from_rows(rows);

    info!(
        subsystem = "api",
        component = "overlap",
        op = "overlap",
        layer1 = %request.layer1,
        layer2 = %request.layer2,
        result_count = collection.features.len(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Overlap query complete"
    );

    Ok(Json(collection))
}
