// HTTP + WebSocket routes

mod http;
mod ws;

use axum::{Router, routing::get};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};

use crate::config::AppConfig;
use crate::history_repo::HistoryRepo;
use crate::models::DeviceScan;
use crate::snmp_repo::SnmpRepo;
use crate::status_board::StatusBoard;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) status_tx: broadcast::Sender<DeviceScan>,
    pub(crate) board: Arc<StatusBoard>,
    pub(crate) history_repo: Arc<HistoryRepo>,
    pub(crate) snmp_repo: Arc<SnmpRepo>,
    pub(crate) ws_status_connections: Arc<AtomicUsize>,
    pub(crate) config: AppConfig,
}

pub fn app(
    status_tx: broadcast::Sender<DeviceScan>,
    board: Arc<StatusBoard>,
    history_repo: Arc<HistoryRepo>,
    snmp_repo: Arc<SnmpRepo>,
    ws_status_connections: Arc<AtomicUsize>,
    config: AppConfig,
) -> Router {
    let state = AppState {
        status_tx,
        board,
        history_repo,
        snmp_repo,
        ws_status_connections,
        config,
    };
    Router::new()
        .route("/", get(|| async { "routerwatch: SNMP uptime monitor" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/devices", get(http::devices_handler)) // GET /api/devices
        .route("/api/devices/{name}", get(http::device_detail_handler)) // GET /api/devices/{name}
        .route("/ws/status", get(ws::ws_status)) // WS /ws/status
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
