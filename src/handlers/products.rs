use axum::extract::{Path, Query, State};
use axum::Json;

use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::handlers::AppState;
use crate::services::catalog::{
    CatalogQuery, HomeResponse, ProductDetailResponse, ProductListResponse,
};
use crate::ApiResponse;

/// GET /
///
/// Storefront landing data: featured products plus the category strip.
pub async fn home(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<HomeResponse>>, ServiceError> {
    let response = state.services.catalog.home().await?;
    Ok(success_response(response))
}

/// GET /products
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<ApiResponse<ProductListResponse>>, ServiceError> {
    let response = state.services.catalog.list_products(query).await?;
    Ok(success_response(response))
}

/// GET /products/:slug
pub async fn get_product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<ProductDetailResponse>>, ServiceError> {
    let response = state.services.catalog.get_product(&slug).await?;
    Ok(success_response(response))
}
