use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::mail::MailError;
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Mail error: {0}")]
    Mail(#[from] MailError),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

fn hide_in_production(detail: String, generic: &str) -> String {
    if is_production() {
        generic.to_string()
    } else {
        detail
    }
}

impl AppError {
    /// HTTP status and machine-readable code
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            AppError::Template(e) => template_status(e),
            AppError::Mail(MailError::Collaborator(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "REPOSITORY_UNAVAILABLE")
            }
            AppError::Mail(MailError::Validation(_)) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Mail(MailError::Render(e)) => template_status(e),
            AppError::Mail(MailError::Persistence(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "PERSISTENCE_ERROR")
            }
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message shown to the client
    fn client_message(&self) -> String {
        let detail = self.to_string();
        match self {
            AppError::Config(_) => hide_in_production(detail, "Configuration error"),
            AppError::Mail(MailError::Persistence(_)) => {
                hide_in_production(detail, "Service temporarily unavailable")
            }
            AppError::Internal(_) => hide_in_production(detail, "Internal server error"),
            _ => detail,
        }
    }
}

fn template_status(err: &TemplateError) -> (StatusCode, &'static str) {
    if err.is_argument_error() {
        (StatusCode::BAD_REQUEST, "INVALID_ARGUMENTS")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "RENDER_ERROR")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let client_message = self.client_message();

        // Always log the detailed error server-side
        tracing::error!(
            code = %code,
            status = %status.as_u16(),
            message = %self,
            "API error"
        );

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
