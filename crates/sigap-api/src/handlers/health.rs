use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use tracing::warn;

use crate::AppState;

/// Liveness plus a `SELECT 1` store check and a converter check.
///
/// Always `200`; component state is reported in the body.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let store = match state.store.ping().await {
        Ok(()) => "up",
        Err(e) => {
            warn!(subsystem = "api", component = "health", error = %e, "Store ping failed");
            "down"
        }
    };
    let importer = match state.ingest.importer().health_check().await {
        Ok(true) => "up",
        _ => "down",
    };

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "store": store,
        "importer": importer,
    }))
}
