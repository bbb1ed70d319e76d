//! Health check endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub repository: RepositoryHealthResponse,
    pub templates_dir: String,
}

#[derive(Debug, Serialize)]
pub struct RepositoryHealthResponse {
    pub backend: String,
    pub available: bool,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let available = state.repository.ensure_available().is_ok();
    let status = if available { "healthy" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        repository: RepositoryHealthResponse {
            backend: state.repository.backend_name().to_string(),
            available,
        },
        templates_dir: state.settings.templates.dir.display().to_string(),
    })
}
