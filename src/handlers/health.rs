use axum::Json;
use chrono::Utc;
use serde_json::{json, Value};

/// GET /health-check
///
/// Liveness probe; does not touch the database.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reports_ok_with_timestamp() {
        let Json(body) = health_check().await;
        assert_eq!(body["status"], "ok");
        assert!(body["timestamp"].as_str().is_some());
    }
}
