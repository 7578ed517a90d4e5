use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::services::OrchestratorError;

/// Every error kind the HTTP surface can produce, mapped to a status code
/// and a JSON body of `{error, details?, parseErrors?, requestId}`.
/// `CacheError` deliberately has no variant here — it's caught and logged at
/// the cache boundary and converted to a miss or `stored: false`, never
/// surfaced to the caller.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Parse(String),
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
    request_id: String,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Validation(message) => ApiError::Validation(message),
            OrchestratorError::Parse(message) => ApiError::Parse(message),
            OrchestratorError::Timeout => ApiError::Timeout,
            OrchestratorError::Internal(message) => ApiError::Internal(message),
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::Parse(_) => StatusCode::BAD_REQUEST,
            ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The request ID is attached by the response middleware after the
    /// handler returns; handlers needing it in the error body itself pass
    /// it explicitly via [`with_request_id`].
    pub fn with_request_id(self, request_id: impl Into<String>) -> Response {
        let request_id = request_id.into();
        let status = self.status();
        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(request_id, error = %self, "unhandled internal error");
        } else {
            tracing::warn!(request_id, error = %self, "request rejected");
        }
        let body = ErrorBody { error: self.to_string(), details: None, request_id };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.with_request_id("unknown")
    }
}

pub fn usage_document(config: &crate::config::Config) -> serde_json::Value {
    json!({
        "description": "POST a CSV document (or pre-parsed records) to profile it.",
        "body": {
            "csv": "string",
            "options": {
                "delimiter": null,
                "skipEmptyLines": true,
                "enableSampling": true,
                "sampleSize": config.sampling.default_max_sample_size,
                "fullAnalysis": false,
                "useCache": true,
            }
        }
    })
}
