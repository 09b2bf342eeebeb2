use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use snafu::Snafu;

use crate::service::{AccessError, PassError};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ApiError {
    #[snafu(display("missing or invalid cron secret"))]
    Unauthorized,

    #[snafu(display("the unlock trigger is not enabled"))]
    TriggerDisabled,

    #[snafu(display("{source}"))]
    Access { source: AccessError },

    #[snafu(display("unlock pass failed: {source}"))]
    Pass { source: PassError },
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    message: String,
    error: String,
    data: Value,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::TriggerDisabled => StatusCode::NOT_FOUND,
            ApiError::Access { source } => match source {
                AccessError::MembershipNotFound { .. }
                | AccessError::NoCourse { .. }
                | AccessError::ModuleNotFound { .. } => StatusCode::NOT_FOUND,
                AccessError::Inactive { .. } | AccessError::Locked { .. } => StatusCode::FORBIDDEN,
                AccessError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Pass { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> ErrorResponse {
        let message = self.to_string();

        let (error, data) = match self {
            ApiError::Access { source } => {
                let tagged = serde_json::to_value(source).unwrap_or_default();
                let error = tagged["error"].as_str().unwrap_or("Access").to_string();
                (error, tagged["data"].clone())
            }
            ApiError::Unauthorized => ("Unauthorized".to_string(), Value::Null),
            ApiError::TriggerDisabled => ("TriggerDisabled".to_string(), Value::Null),
            ApiError::Pass { .. } => ("PassFailed".to_string(), Value::Null),
        };

        ErrorResponse { message, error, data }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(error = ?self, "request failed: {}", self);
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(self.body())).into_response()
    }
}
