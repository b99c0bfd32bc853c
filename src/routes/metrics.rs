//! Runtime metrics endpoint
//!
//! Serves the registry snapshot as JSON. Returns 404 when `ENABLE_METRICS`
//! is off.

use axum::{extract::State, routing::get, Json, Router};

use crate::error::{AppError, Result};
use crate::metrics::MetricsSnapshot;
use crate::state::AppState;

/// Create the metrics router
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(metrics_snapshot))
}

/// GET /api/v1/metrics
async fn metrics_snapshot(State(state): State<AppState>) -> Result<Json<MetricsSnapshot>> {
    if !state.config().enable_metrics {
        return Err(AppError::NotFound("metrics are disabled".to_string()));
    }

    Ok(Json(state.uploads().metrics_snapshot()))
}
