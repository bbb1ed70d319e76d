//! Mail creation endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde_json::Value;

use crate::error::Result;
use crate::mail::CreatedMail;
use crate::server::AppState;

/// POST /api/v1/mails - create one mail (object body) or a batch (array body)
pub async fn create_mails(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<CreatedMail>)> {
    let created = state.composer.create_from_json(body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}
