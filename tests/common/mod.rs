use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

use marketplace_api::{
    app_router,
    auth::{self, AuthService},
    config::AppConfig,
    db,
    entities::{category, product, user, user::Role},
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};

pub const TEST_PASSWORD: &str = "password123";

/// Helper harness for spinning up an application backed by a
/// file-based SQLite database in a per-test temp directory.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _tmp: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().expect("create temp dir for test app");
        let db_path = tmp.path().join("marketplace_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "test_secret_key_for_testing_purposes_only_needs_sixty_four_chars!".to_string(),
            3600,
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.uploads_dir = tmp.path().join("uploads").display().to_string();

        let pool = db::connect(&cfg).await.expect("open test sqlite");
        db::run_migrations(&pool).await.expect("migrate test schema");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let auth_service = Arc::new(AuthService::new(&cfg));
        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            auth_service.clone(),
            &cfg,
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            auth: auth_service,
            services,
        };

        let router = app_router(state.clone());

        Self {
            router,
            state,
            _tmp: tmp,
            _event_task: event_task,
        }
    }

    /// Directory checkout stores payment proofs under.
    #[allow(dead_code)]
    pub fn uploads_dir(&self) -> std::path::PathBuf {
        std::path::PathBuf::from(&self.state.config.uploads_dir)
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Register an account through the API; returns (user id, token).
    pub async fn register_user(&self, name: &str, email: &str, role: &str) -> (Uuid, String) {
        let response = self
            .request(
                Method::POST,
                "/auth/register",
                Some(json!({
                    "name": name,
                    "email": email,
                    "password": TEST_PASSWORD,
                    "role": role,
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED, "register {}", email);
        let body = read_json(response).await;
        let id = body["data"]["user"]["id"]
            .as_str()
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .expect("user id in register response");
        let token = body["data"]["token"]
            .as_str()
            .expect("token in register response")
            .to_string();
        (id, token)
    }

    #[allow(dead_code)]
    pub async fn register_buyer(&self, email: &str) -> (Uuid, String) {
        self.register_user("Test Buyer", email, "buyer").await
    }

    #[allow(dead_code)]
    pub async fn register_seller(&self, email: &str) -> (Uuid, String) {
        self.register_user("Test Seller", email, "seller").await
    }

    /// Login through the API; returns the bearer token.
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({
                    "email": email,
                    "password": TEST_PASSWORD,
                })),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK, "login {}", email);
        let body = read_json(response).await;
        body["data"]["token"]
            .as_str()
            .expect("token in login response")
            .to_string()
    }

    /// Admin accounts cannot self-register, so seed one directly.
    #[allow(dead_code)]
    pub async fn create_admin(&self, email: &str) -> String {
        let now = Utc::now();
        user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Admin".to_string()),
            email: Set(email.to_string()),
            password_hash: Set(auth::hash_password(TEST_PASSWORD).expect("hash test password")),
            role: Set(Role::Admin),
            is_blocked: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("insert admin");
        self.login(email).await
    }

    pub async fn seed_category(&self, name: &str, slug: &str) -> category::Model {
        let now = Utc::now();
        category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            description: Set(Some(format!("Products in the {} category", name))),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed category")
    }

    pub async fn seed_product(
        &self,
        seller_id: Uuid,
        category_id: Uuid,
        name: &str,
        slug: &str,
        price: Decimal,
        stock: i32,
    ) -> product::Model {
        self.seed_product_with_active(seller_id, category_id, name, slug, price, stock, true)
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn seed_product_with_active(
        &self,
        seller_id: Uuid,
        category_id: Uuid,
        name: &str,
        slug: &str,
        price: Decimal,
        stock: i32,
        is_active: bool,
    ) -> product::Model {
        let now = Utc::now();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            seller_id: Set(seller_id),
            category_id: Set(category_id),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
            description: Set(format!("{} for integration tests", name)),
            price: Set(price),
            stock: Set(stock),
            image_path: Set(None),
            is_active: Set(is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.state.db)
        .await
        .expect("seed product")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

/// Decode a response body as JSON.
pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("read response body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("response body is json")
}

/// Parse a JSON money field into a `Decimal`.
///
/// Money is serialized as a string; its scale depends on the database
/// backend ("5" vs "5.00"), so tests compare values, never strings.
#[allow(dead_code)]
pub fn money(value: &Value) -> Decimal {
    value
        .as_str()
        .and_then(|raw| raw.parse::<Decimal>().ok())
        .unwrap_or_else(|| panic!("not a money field: {}", value))
}
