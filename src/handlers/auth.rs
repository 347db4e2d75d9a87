use axum::{extract::State, http::StatusCode, Json};

use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::handlers::AppState;
use crate::services::users::{AuthResponse, LoginInput, RegisterInput};
use crate::ApiResponse;

/// POST /auth/register
///
/// Creates a buyer or seller account and returns a token for it.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<(StatusCode, Json<ApiResponse<AuthResponse>>), ServiceError> {
    let response = state.services.users.register(input).await?;
    Ok(created_response(response))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> Result<Json<ApiResponse<AuthResponse>>, ServiceError> {
    let response = state.services.users.login(input).await?;
    Ok(success_response(response))
}
