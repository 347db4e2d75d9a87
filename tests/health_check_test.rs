mod common;

use axum::http::{Method, StatusCode};
use common::{read_json, TestApp};

#[tokio::test]
async fn health_check_works_without_auth() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health-check", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp"].is_string());
}
