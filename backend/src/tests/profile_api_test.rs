use axum::http::StatusCode;
use serde_json::json;

use super::common::{get_json, post_json, test_router};

#[tokio::test]
async fn usage_document_describes_the_endpoint() {
    let (router, _dir) = test_router();
    let (status, body) = get_json(&router, "/api/profile").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_object());
}

#[tokio::test]
async fn valid_csv_is_profiled() {
    let (router, _dir) = test_router();
    let body = json!({ "csv": "a,b\n1,x\n2,y\n3,z\n4,w\n5,q\n" });
    let (status, response) = post_json(&router, "/api/profile", body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], json!(true));
    assert_eq!(response["fromCache"], json!(false));
    assert_eq!(response["data"]["summary"]["totalRows"], json!(5));
    assert_eq!(response["data"]["summary"]["totalColumns"], json!(2));
}

#[tokio::test]
async fn missing_csv_field_is_a_validation_error() {
    let (router, _dir) = test_router();
    let (status, response) = post_json(&router, "/api/profile", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.get("error").is_some());
    assert!(response.get("requestId").is_some());
}

#[tokio::test]
async fn non_string_csv_field_is_a_validation_error() {
    let (router, _dir) = test_router();
    let (status, response) = post_json(&router, "/api/profile", json!({ "csv": 42 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.get("error").is_some());
}

#[tokio::test]
async fn repeated_request_hits_the_cache_on_the_second_call() {
    let (router, _dir) = test_router();
    let body = json!({ "csv": "a,b\n1,x\n2,y\n3,z\n4,w\n5,q\n" });

    let (status1, first) = post_json(&router, "/api/profile", body.clone()).await;
    assert_eq!(status1, StatusCode::OK);
    assert_eq!(first["fromCache"], json!(false));

    let (status2, second) = post_json(&router, "/api/profile", body).await;
    assert_eq!(status2, StatusCode::OK);
    assert_eq!(second["fromCache"], json!(true));
    assert_eq!(first["data"]["summary"]["totalRows"], second["data"]["summary"]["totalRows"]);
}

#[tokio::test]
async fn csv_below_minimum_length_is_rejected() {
    let (router, _dir) = test_router();
    let (status, response) = post_json(&router, "/api/profile", json!({ "csv": "a,b\n1" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response.get("error").is_some());
}
