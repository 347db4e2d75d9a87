use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::errors::ServiceError;
use crate::handlers::common::{created_response, success_response};
use crate::handlers::AppState;
use crate::services::cart::CartResponse;
use crate::services::checkout::{OrderConfirmation, PlaceOrderInput};
use crate::services::orders::{OrderListResponse, OrderResponse};
use crate::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u64>,
}

/// GET /orders
pub async fn list_orders(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let page = query.page.unwrap_or(1);
    let response = state.services.orders.list_orders(user.id, page).await?;
    Ok(success_response(response))
}

/// GET /orders/create
///
/// Checkout preview: the cart as it would be ordered. Rejects an empty cart
/// so the client never renders a zero-line checkout form.
pub async fn checkout_preview(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<CartResponse>>, ServiceError> {
    let cart = state.services.checkout.preview(user.id).await?;
    Ok(success_response(cart))
}

/// POST /orders
pub async fn place_order(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(input): Json<PlaceOrderInput>,
) -> Result<(StatusCode, Json<ApiResponse<OrderConfirmation>>), ServiceError> {
    let confirmation = state.services.checkout.place_order(user.id, input).await?;
    Ok(created_response(confirmation))
}

/// GET /orders/:id
pub async fn get_order(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let order = state.services.orders.get_order(user.id, id).await?;
    Ok(success_response(order))
}
