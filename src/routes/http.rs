// GET handlers: version, dashboard, device detail

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;

use super::AppState;
use crate::models::CounterReading;
use crate::render::{self, DashboardRow, DeviceDetail};
use crate::version::{NAME, VERSION};

/// GET /version: returns service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/devices: one row per configured device, reachable or not.
pub(super) async fn devices_handler(State(state): State<AppState>) -> Json<Vec<DashboardRow>> {
    let rows = state
        .board
        .snapshot()
        .await
        .iter()
        .map(render::dashboard_row)
        .collect();
    Json(rows)
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct DetailQuery {
    /// Poll the device now instead of using the last scan.
    #[serde(default)]
    refresh: bool,
}

/// GET /api/devices/{name}: counters, history-derived uptime and status timeline.
pub(super) async fn device_detail_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<DetailQuery>,
) -> Result<Json<DeviceDetail>, (StatusCode, String)> {
    let Some(device) = state.config.device(&name).cloned() else {
        return Err((StatusCode::NOT_FOUND, format!("device not found: {}", name)));
    };

    let reading = if query.refresh {
        state.snmp_repo.poll(&device).await
    } else {
        state
            .board
            .get(&name)
            .await
            .map(|scan| scan.reading)
            .unwrap_or_else(CounterReading::unknown)
    };

    let points = state.history_repo.get_timeline(&name).await.map_err(|e| {
        tracing::error!(
            device = %name,
            error = %e,
            operation = "get_timeline",
            "timeline query failed"
        );
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "uptime history unavailable".to_string(),
        )
    })?;

    let today = chrono::Local::now().date_naive();
    Ok(Json(render::device_detail(&device, &reading, &points, today)))
}
