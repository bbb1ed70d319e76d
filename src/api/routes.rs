use axum::{
    routing::{get, post},
    Router,
};

use crate::server::AppState;

use super::health::health;
use super::mails::create_mails;
use super::metrics::prometheus_metrics;
use super::preview::{preview_default, preview_template, render_template};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health & Metrics
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        // Template preview
        .route("/preview", get(preview_default))
        .route(
            "/preview/{template}",
            get(preview_template).post(render_template),
        )
        // Mail creation
        .nest("/api/v1", Router::new().route("/mails", post(create_mails)))
}
