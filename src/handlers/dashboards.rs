use axum::extract::State;
use axum::response::Redirect;
use axum::{Extension, Json};

use crate::auth::CurrentUser;
use crate::entities::user::Role;
use crate::errors::ServiceError;
use crate::handlers::common::success_response;
use crate::handlers::AppState;
use crate::services::dashboard::{AdminDashboard, BuyerDashboard, SellerDashboard};
use crate::ApiResponse;

/// GET /dashboard
///
/// Role-neutral entry point: 303 to the dashboard for the caller's role.
pub async fn dashboard_redirect(Extension(user): Extension<CurrentUser>) -> Redirect {
    let target = match user.role {
        Role::Admin => "/admin/dashboard",
        Role::Seller => "/seller/dashboard",
        Role::Buyer => "/buyer/dashboard",
    };
    Redirect::to(target)
}

/// GET /admin/dashboard
pub async fn admin_dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<AdminDashboard>>, ServiceError> {
    let dashboard = state.services.dashboard.admin_dashboard().await?;
    Ok(success_response(dashboard))
}

/// GET /buyer/dashboard
pub async fn buyer_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<BuyerDashboard>>, ServiceError> {
    let dashboard = state.services.dashboard.buyer_dashboard(user.id).await?;
    Ok(success_response(dashboard))
}

/// GET /seller/dashboard
pub async fn seller_dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<SellerDashboard>>, ServiceError> {
    let dashboard = state.services.dashboard.seller_dashboard(user.id).await?;
    Ok(success_response(dashboard))
}
