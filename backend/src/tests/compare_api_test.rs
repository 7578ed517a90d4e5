use axum::http::StatusCode;
use serde_json::json;

use super::common::{post_json, test_router};

#[tokio::test]
async fn comparing_two_datasets_reports_a_row_count_delta() {
    let (router, _dir) = test_router();
    let dataset1: Vec<_> = (0..10).map(|i| json!({ "x": i })).collect();
    let dataset2: Vec<_> = (0..20).map(|i| json!({ "x": i })).collect();

    let body = json!({ "dataset1": dataset1, "dataset2": dataset2 });
    let (status, response) = post_json(&router, "/api/compare", body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], json!(true));
    assert_eq!(response["comparison"]["rowCountDelta"], json!(10));
    assert_eq!(response["profile1"]["summary"]["totalRows"], json!(10));
    assert_eq!(response["profile2"]["summary"]["totalRows"], json!(20));
}

#[tokio::test]
async fn sign_flip_between_datasets_is_flagged_as_an_insight() {
    let (router, _dir) = test_router();
    // In dataset1, y tracks x upward; in dataset2, y tracks x downward.
    let dataset1: Vec<_> = (1..=10).map(|i| json!({ "x": i, "y": i })).collect();
    let dataset2: Vec<_> = (1..=10).map(|i| json!({ "x": i, "y": 11 - i })).collect();

    let body = json!({ "dataset1": dataset1, "dataset2": dataset2 });
    let (status, response) = post_json(&router, "/api/compare", body).await;

    assert_eq!(status, StatusCode::OK);
    let changes = response["comparison"]["correlationChanges"]["changed"]
        .as_array()
        .cloned()
        .unwrap_or_default();
    assert!(changes.iter().any(|c| c["signChange"] == json!(true)));
}

#[tokio::test]
async fn missing_dataset_is_a_validation_error() {
    let (router, _dir) = test_router();
    let (status, response) = post_json(&router, "/api/compare", json!({ "dataset1": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.get("error").is_some());
}
