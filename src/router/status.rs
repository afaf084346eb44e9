//! `GET /api/status`, `GET /api/health` — operational introspection
//! endpoints (§6), no upstream fetch involved.

use axum::extract::State;
use axum::Json;

use crate::core::types::{HealthResponse, ProxyStatus, StatusResponse};
use crate::core::AppState;
use crate::session::cookie::now_secs;

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        proxy: ProxyStatus {
            configured: state.proxy.use_proxy,
            host: state.proxy.host.clone(),
            region: state.proxy.region.clone(),
        },
        target_site: state.config.target_site.clone(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: now_secs(),
    })
}
