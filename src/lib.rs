//! Marketplace API Library
//!
//! This crate provides the core functionality for the Marketplace API
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod services;

use axum::routing::{get, patch, post};
use axum::Router;
use serde::Serialize;
use std::sync::Arc;

use crate::auth::{AuthRouterExt, AuthService, AuthState};
use crate::entities::user::Role;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<db::DbPool>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub auth: Arc<AuthService>,
    pub services: handlers::AppServices,
}

impl AppState {
    /// State handed to the auth middleware layers.
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            db: (*self.db).clone(),
            auth: self.auth.clone(),
        }
    }
}

// Common response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// Builds the complete HTTP surface on top of the given state.
///
/// Route groups:
/// - public storefront and account creation, no token required
/// - account routes behind the bearer-token middleware
/// - dashboards behind token plus role middleware
pub fn app_router(state: AppState) -> Router {
    let auth_state = state.auth_state();

    let public = Router::new()
        .route("/health-check", get(handlers::health::health_check))
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/", get(handlers::products::home))
        .route("/products", get(handlers::products::list_products))
        .route("/products/:slug", get(handlers::products::get_product));

    let account = Router::new()
        .route(
            "/cart",
            get(handlers::cart::get_cart).post(handlers::cart::add_to_cart),
        )
        .route(
            "/cart/:id",
            patch(handlers::cart::update_cart_item).delete(handlers::cart::remove_cart_item),
        )
        .route(
            "/orders",
            get(handlers::orders::list_orders).post(handlers::orders::place_order),
        )
        .route("/orders/create", get(handlers::orders::checkout_preview))
        .route("/orders/:id", get(handlers::orders::get_order))
        .route("/dashboard", get(handlers::dashboards::dashboard_redirect))
        .with_auth(auth_state.clone());

    let buyer = Router::new()
        .route(
            "/buyer/dashboard",
            get(handlers::dashboards::buyer_dashboard),
        )
        .with_role(auth_state.clone(), Role::Buyer);

    let seller = Router::new()
        .route(
            "/seller/dashboard",
            get(handlers::dashboards::seller_dashboard),
        )
        .with_role(auth_state.clone(), Role::Seller);

    let admin = Router::new()
        .route(
            "/admin/dashboard",
            get(handlers::dashboards::admin_dashboard),
        )
        .with_role(auth_state, Role::Admin);

    Router::new()
        .merge(public)
        .merge(account)
        .merge(buyer)
        .merge(seller)
        .merge(admin)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_wraps_data() {
        let body = serde_json::to_value(ApiResponse::success(vec![1, 2, 3])).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["data"], serde_json::json!([1, 2, 3]));
    }
}
