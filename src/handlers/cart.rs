use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, no_content_response, success_response};
use crate::handlers::AppState;
use crate::services::cart::{AddToCartInput, CartResponse, UpdateCartItemInput};
use crate::ApiResponse;

/// GET /cart
pub async fn get_cart(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<CartResponse>>, ServiceError> {
    let cart = state.services.cart.get_cart(user.id).await?;
    Ok(success_response(cart))
}

/// POST /cart
///
/// Adds a product, summing with any quantity already in the cart.
pub async fn add_to_cart(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<AddToCartInput>,
) -> Result<(StatusCode, Json<ApiResponse<CartResponse>>), ServiceError> {
    let cart = state.services.cart.add_item(user.id, input).await?;
    Ok(created_response(cart))
}

/// PATCH /cart/:id
pub async fn update_cart_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateCartItemInput>,
) -> Result<Json<ApiResponse<CartResponse>>, ServiceError> {
    let cart = state.services.cart.update_item(user.id, id, input).await?;
    Ok(success_response(cart))
}

/// DELETE /cart/:id
pub async fn remove_cart_item(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state.services.cart.remove_item(user.id, id).await?;
    Ok(no_content_response())
}
