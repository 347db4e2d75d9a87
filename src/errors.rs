//! The service-level error type and its HTTP rendering.
//!
//! Services return [`ServiceError`] and handlers bubble it up with `?`; the
//! [`IntoResponse`] impl turns it into the JSON error envelope. Variants in
//! the client-visible group render their message to the caller verbatim, so
//! keep those messages free of internals.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    // Client-visible failures. The Display output goes to the caller as-is.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("{0}")]
    InsufficientStock(String),

    // Internal failures. Clients get a generic message, logs get the cause.
    #[error("database error: {0}")]
    DatabaseError(#[from] sea_orm::error::DbErr),

    #[error("password hashing failed: {0}")]
    HashError(String),

    #[error("upload storage failed: {0}")]
    StorageError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::EmptyCart | Self::InsufficientStock(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::DatabaseError(_) | Self::HashError(_) | Self::StorageError(_) | Self::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The message shown to the client. Server-side failures are collapsed to
    /// a generic string so nothing internal leaks through the API.
    pub fn response_message(&self) -> String {
        if self.status_code().is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        }
    }
}

/// JSON body every failing endpoint responds with.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Reason phrase of the HTTP status ("Not Found", "Conflict", ...).
    pub error: String,
    pub message: String,
    /// RFC 3339 timestamp of when the failure was rendered.
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(status: StatusCode, message: String) -> Self {
        Self {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {}", self);
        }
        let body = ErrorResponse::new(status, self.response_message());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn every_variant_maps_to_its_status() {
        let cases = [
            (ServiceError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                ServiceError::ValidationError("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Unauthorized("x".into()),
                StatusCode::UNAUTHORIZED,
            ),
            (ServiceError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (ServiceError::Conflict("x".into()), StatusCode::CONFLICT),
            (ServiceError::EmptyCart, StatusCode::UNPROCESSABLE_ENTITY),
            (
                ServiceError::InsufficientStock("x".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                ServiceError::HashError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::StorageError("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::DatabaseError(sea_orm::error::DbErr::Custom("x".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "wrong status for {err:?}");
        }
    }

    #[test]
    fn client_facing_messages_pass_through_unchanged() {
        let err = ServiceError::Forbidden("This order belongs to another buyer".into());
        assert_eq!(err.response_message(), "This order belongs to another buyer");

        let err = ServiceError::InsufficientStock("Not enough stock available for Gadget".into());
        assert_eq!(
            err.response_message(),
            "Not enough stock available for Gadget"
        );

        assert_eq!(ServiceError::EmptyCart.response_message(), "Your cart is empty");
    }

    #[test]
    fn internal_messages_are_masked() {
        let masked = [
            ServiceError::HashError("argon2 state dump".into()),
            ServiceError::StorageError("/var/uploads denied".into()),
            ServiceError::DatabaseError(sea_orm::error::DbErr::Custom("pool gone".into())),
            ServiceError::Other(anyhow::anyhow!("stack trace")),
        ];
        for err in masked {
            assert_eq!(err.response_message(), "Internal server error");
        }
    }

    #[test]
    fn validator_failures_become_validation_errors() {
        use validator::ValidationErrors;

        let mut errs = ValidationErrors::new();
        errs.add("quantity", validator::ValidationError::new("range"));
        let err: ServiceError = errs.into();
        assert!(matches!(err, ServiceError::ValidationError(_)));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rendered_envelope_carries_reason_and_message() {
        let response = ServiceError::NotFound("Product not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.error, "Not Found");
        assert_eq!(body.message, "Product not found");
        assert!(!body.timestamp.is_empty());
    }
}
