pub mod auth;
pub mod cart;
pub mod common;
pub mod dashboards;
pub mod health;
pub mod orders;
pub mod products;

use std::sync::Arc;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::events::EventSender;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::catalog::CatalogService>,
    pub cart: Arc<crate::services::cart::CartService>,
    pub checkout: Arc<crate::services::checkout::CheckoutService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub dashboard: Arc<crate::services::dashboard::DashboardService>,
    pub users: Arc<crate::services::users::UserService>,
}

impl AppServices {
    /// Build the full service container shared by every handler.
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        auth_service: Arc<AuthService>,
        config: &AppConfig,
    ) -> Self {
        let catalog = Arc::new(crate::services::catalog::CatalogService::new(
            db_pool.clone(),
        ));
        let cart = Arc::new(crate::services::cart::CartService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(crate::services::checkout::CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            cart.clone(),
            config.uploads_dir.clone(),
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(db_pool.clone()));
        let dashboard = Arc::new(crate::services::dashboard::DashboardService::new(
            db_pool.clone(),
            orders.clone(),
        ));
        let users = Arc::new(crate::services::users::UserService::new(
            db_pool,
            event_sender,
            auth_service,
        ));

        Self {
            catalog,
            cart,
            checkout,
            orders,
            dashboard,
            users,
        }
    }
}
