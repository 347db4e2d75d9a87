use axum::{http::StatusCode, Json};
use serde::Serialize;

use crate::ApiResponse;

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Standard no content response
pub fn no_content_response() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_envelope_shape() {
        let Json(body) = success_response(serde_json::json!({"total": "44.98"}));
        let encoded = serde_json::to_value(&body).unwrap();
        assert_eq!(encoded["success"], true);
        assert_eq!(encoded["data"]["total"], "44.98");
    }

    #[test]
    fn created_response_status() {
        let (status, _) = created_response("ok");
        assert_eq!(status, StatusCode::CREATED);
    }

    #[test]
    fn no_content_status() {
        assert_eq!(no_content_response(), StatusCode::NO_CONTENT);
    }
}
