use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use axum::response::Response;

use crate::middleware::RequestId;
use crate::models::{Cell, ColumnStats, CorrelationPartitions, Insight, ProfileOptions, SamplingMetadata, Summary};
use crate::utils::error::{usage_document, ApiError};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileMetadata {
    sampling: SamplingMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileData {
    summary: Summary,
    columns: HashMap<String, ColumnStats>,
    correlations: CorrelationPartitions,
    insights: Vec<Insight>,
    metadata: ProfileMetadata,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    success: bool,
    request_id: String,
    from_cache: bool,
    data: ProfileData,
}

/// Pulls `csv` and `options` out of a raw JSON body rather than relying on
/// Axum's `Json<T>` extractor directly, so a missing or non-string `csv`
/// field becomes a `400 {error, requestId}` body instead of Axum's own
/// rejection response.
fn extract_csv_and_options(body: &Value) -> Result<(String, ProfileOptions), ApiError> {
    let csv = match body.get("csv") {
        None => return Err(ApiError::Validation("csv is required".to_string())),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(ApiError::Validation("csv must be a string".to_string())),
    };

    let options = match body.get("options") {
        None | Some(Value::Null) => ProfileOptions::default(),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| ApiError::Validation(format!("invalid options: {err}")))?,
    };

    Ok((csv, options))
}

/// `POST /api/profile` — profile a raw CSV document.
pub async fn profile(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<Value>,
) -> Result<Json<ProfileResponse>, Response> {
    let (csv, options) =
        extract_csv_and_options(&body).map_err(|e| e.with_request_id(request_id.0.clone()))?;

    let outcome = state
        .orchestrator
        .profile_csv(&csv, &options)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.0.clone()))?;

    Ok(Json(ProfileResponse {
        success: true,
        request_id: request_id.0,
        from_cache: outcome.from_cache,
        data: ProfileData {
            summary: outcome.report.summary,
            columns: outcome.report.column_stats,
            correlations: outcome.report.correlations,
            insights: outcome.report.insights,
            metadata: ProfileMetadata { sampling: outcome.sampling },
        },
    }))
}

/// `GET /api/profile` — self-describing usage document, no side effects.
pub async fn profile_usage(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(usage_document(&state.config))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareResponse {
    success: bool,
    request_id: String,
    comparison: crate::services::comparison::ComparisonReport,
    profile1: ProfileEcho,
    profile2: ProfileEcho,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileEcho {
    summary: Summary,
    sampling: SamplingMetadata,
}

fn extract_datasets(
    body: &Value,
) -> Result<(Vec<HashMap<String, Cell>>, Vec<HashMap<String, Cell>>, ProfileOptions), ApiError> {
    let dataset1 = body
        .get("dataset1")
        .ok_or_else(|| ApiError::Validation("dataset1 is required".to_string()))?;
    let dataset2 = body
        .get("dataset2")
        .ok_or_else(|| ApiError::Validation("dataset2 is required".to_string()))?;

    let dataset1: Vec<HashMap<String, Cell>> = serde_json::from_value(dataset1.clone())
        .map_err(|err| ApiError::Validation(format!("dataset1 is malformed: {err}")))?;
    let dataset2: Vec<HashMap<String, Cell>> = serde_json::from_value(dataset2.clone())
        .map_err(|err| ApiError::Validation(format!("dataset2 is malformed: {err}")))?;

    let options = match body.get("options") {
        None | Some(Value::Null) => ProfileOptions::default(),
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|err| ApiError::Validation(format!("invalid options: {err}")))?,
    };

    Ok((dataset1, dataset2, options))
}

/// `POST /api/compare` — profile two already-parsed record sets in
/// parallel and diff the resulting reports.
pub async fn compare(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    Json(body): Json<Value>,
) -> Result<Json<CompareResponse>, Response> {
    let (dataset1, dataset2, options) =
        extract_datasets(&body).map_err(|e| e.with_request_id(request_id.0.clone()))?;

    let outcome = state
        .orchestrator
        .compare(dataset1, dataset2, &options)
        .await
        .map_err(|e| ApiError::from(e).with_request_id(request_id.0.clone()))?;

    Ok(Json(CompareResponse {
        success: true,
        request_id: request_id.0,
        comparison: outcome.comparison,
        profile1: ProfileEcho {
            summary: outcome.first.report.summary,
            sampling: outcome.first.sampling,
        },
        profile2: ProfileEcho {
            summary: outcome.second.report.summary,
            sampling: outcome.second.sampling,
        },
    }))
}
