//! Integration tests for the admin, seller and buyer dashboards.
//!
//! One fixture builds a small marketplace: two sellers, three buyers
//! (one blocked), four products (one inactive) and two orders placed
//! through checkout, one of which is then delivered.

mod common;

use axum::http::{Method, StatusCode};
use common::{money, read_json, TestApp};
use marketplace_api::entities::order::{self, OrderStatus};
use marketplace_api::entities::user;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use uuid::Uuid;

struct DashboardFixture {
    app: TestApp,
    admin_token: String,
    seller_one_token: String,
    seller_two_token: String,
    alice_token: String,
    carol_token: String,
    order_one_id: String,
    order_two_id: String,
}

async fn place_cod_order(app: &TestApp, token: &str, items: &[(Uuid, i32)]) -> String {
    for (product_id, quantity) in items {
        let added = app
            .request(
                Method::POST,
                "/cart",
                Some(json!({"product_id": product_id, "quantity": quantity})),
                Some(token),
            )
            .await;
        assert_eq!(added.status(), StatusCode::CREATED);
    }
    let response = app
        .request(
            Method::POST,
            "/orders",
            Some(json!({
                "shipping_address": "1 Test Lane",
                "phone": "0800123456",
                "payment_method": "cod",
            })),
            Some(token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    read_json(response).await["data"]["id"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn fixture() -> DashboardFixture {
    let app = TestApp::new().await;

    let (seller_one_id, seller_one_token) = app
        .register_user("Seller One", "seller1@example.com", "seller")
        .await;
    let (seller_two_id, seller_two_token) = app
        .register_user("Seller Two", "seller2@example.com", "seller")
        .await;
    let (_, alice_token) = app
        .register_user("Alice Buyer", "alice@example.com", "buyer")
        .await;
    let (bob_id, _) = app
        .register_user("Bob Buyer", "bob@example.com", "buyer")
        .await;
    let (_, carol_token) = app
        .register_user("Carol Buyer", "carol@example.com", "buyer")
        .await;
    let admin_token = app.create_admin("admin@example.com").await;

    let mut bob: user::ActiveModel = user::Entity::find_by_id(bob_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap()
        .into();
    bob.is_blocked = Set(true);
    bob.update(&*app.state.db).await.unwrap();

    let electronics = app.seed_category("Electronics", "electronics").await;
    let books = app.seed_category("Books", "books").await;

    let amp = app
        .seed_product(seller_one_id, electronics.id, "Amp", "amp", dec!(10.00), 10)
        .await;
    let cable = app
        .seed_product(seller_one_id, electronics.id, "Cable", "cable", dec!(5.50), 10)
        .await;
    let novel = app
        .seed_product(seller_two_id, books.id, "Novel", "novel", dec!(7.00), 10)
        .await;
    app.seed_product_with_active(
        seller_one_id,
        electronics.id,
        "Old Amp",
        "old-amp",
        dec!(30.00),
        0,
        false,
    )
    .await;

    // Alice: one pending order (2 amps + 1 novel), then one order
    // (1 cable) that gets delivered.
    let order_one_id = place_cod_order(&app, &alice_token, &[(amp.id, 2), (novel.id, 1)]).await;
    let order_two_id = place_cod_order(&app, &alice_token, &[(cable.id, 1)]).await;

    let mut delivered: order::ActiveModel =
        order::Entity::find_by_id(Uuid::parse_str(&order_two_id).unwrap())
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap()
            .into();
    delivered.status = Set(OrderStatus::Delivered);
    delivered.update(&*app.state.db).await.unwrap();

    DashboardFixture {
        app,
        admin_token,
        seller_one_token,
        seller_two_token,
        alice_token,
        carol_token,
        order_one_id,
        order_two_id,
    }
}

#[tokio::test]
async fn admin_dashboard_counts_the_whole_marketplace() {
    let fx = fixture().await;

    let response = fx
        .app
        .request(Method::GET, "/admin/dashboard", None, Some(&fx.admin_token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    let stats = &body["data"]["stats"];

    assert_eq!(stats["total_users"], 6);
    assert_eq!(stats["total_sellers"], 2);
    assert_eq!(stats["total_buyers"], 3);
    assert_eq!(stats["blocked_users"], 1);
    assert_eq!(stats["total_products"], 4);
    assert_eq!(stats["active_products"], 3);
    assert_eq!(stats["total_orders"], 2);
    assert_eq!(stats["pending_orders"], 1);
    assert_eq!(stats["total_categories"], 2);
    assert_eq!(
        money(&stats["total_revenue"]),
        dec!(5.50),
        "revenue counts delivered orders only"
    );

    let recent_users = body["data"]["recent_users"].as_array().unwrap();
    assert_eq!(recent_users.len(), 5);
    assert_eq!(recent_users[0]["email"], "admin@example.com");
    assert_eq!(recent_users[0]["role"], "admin");
    assert!(
        recent_users.iter().all(|u| u["email"] != "seller1@example.com"),
        "sixth-newest user falls off"
    );
    assert!(recent_users
        .iter()
        .any(|u| u["email"] == "bob@example.com" && u["is_blocked"] == true));

    let recent_orders = body["data"]["recent_orders"].as_array().unwrap();
    assert_eq!(recent_orders.len(), 2);
    assert_eq!(recent_orders[0]["id"], fx.order_two_id.as_str());
    assert_eq!(recent_orders[0]["buyer_name"], "Alice Buyer");
    assert_eq!(recent_orders[0]["status"], "delivered");
    assert_eq!(recent_orders[0]["item_count"], 1);
    assert_eq!(recent_orders[1]["id"], fx.order_one_id.as_str());
    assert_eq!(recent_orders[1]["status"], "pending");
    assert_eq!(recent_orders[1]["item_count"], 2);
    assert_eq!(money(&recent_orders[1]["total_amount"]), dec!(27.00));

    let recent_products = body["data"]["recent_products"].as_array().unwrap();
    assert_eq!(recent_products.len(), 4);
    assert_eq!(
        recent_products[0]["name"], "Old Amp",
        "admins see inactive products"
    );
}

#[tokio::test]
async fn buyer_dashboard_summarizes_own_orders() {
    let fx = fixture().await;

    let response = fx
        .app
        .request(Method::GET, "/buyer/dashboard", None, Some(&fx.alice_token))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;

    let stats = &body["data"]["stats"];
    assert_eq!(stats["total"], 2);
    assert_eq!(stats["pending"], 1);
    assert_eq!(stats["delivered"], 1);

    let recent = body["data"]["recent_orders"].as_array().unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0]["id"], fx.order_two_id.as_str());
    assert_eq!(recent[0]["item_count"], 1);

    let featured = body["data"]["featured"].as_array().unwrap();
    assert_eq!(featured.len(), 3, "inactive products are not recommended");
    assert_eq!(featured[0]["name"], "Novel", "newest active first");
}

#[tokio::test]
async fn buyer_dashboard_is_empty_without_orders() {
    let fx = fixture().await;

    let body = read_json(
        fx.app
            .request(Method::GET, "/buyer/dashboard", None, Some(&fx.carol_token))
            .await,
    )
    .await;

    let stats = &body["data"]["stats"];
    assert_eq!(stats["total"], 0);
    assert_eq!(stats["pending"], 0);
    assert_eq!(stats["delivered"], 0);
    assert_eq!(body["data"]["recent_orders"].as_array().unwrap().len(), 0);
    // Recommendations are marketplace-wide, not buyer-specific
    assert_eq!(body["data"]["featured"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn seller_dashboard_tracks_own_products_and_sales() {
    let fx = fixture().await;

    let response = fx
        .app
        .request(
            Method::GET,
            "/seller/dashboard",
            None,
            Some(&fx.seller_one_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;

    let stats = &body["data"]["stats"];
    assert_eq!(stats["total_products"], 3);
    assert_eq!(stats["active_products"], 2);
    assert_eq!(
        money(&stats["total_sales"]),
        dec!(25.50),
        "line prices of own sold items, regardless of order status"
    );
    assert_eq!(stats["pending_items"], 1);

    let recent_products = body["data"]["recent_products"].as_array().unwrap();
    assert_eq!(recent_products.len(), 3);
    assert_eq!(recent_products[0]["name"], "Old Amp");
    assert!(recent_products.iter().all(|p| p["name"] != "Novel"));

    let sales = body["data"]["recent_sales"].as_array().unwrap();
    assert_eq!(sales.len(), 2);
    assert_eq!(sales[0]["product_name"], "Cable");
    assert_eq!(sales[0]["buyer_name"], "Alice Buyer");
    assert_eq!(sales[0]["order_status"], "delivered");
    assert_eq!(sales[0]["quantity"], 1);
    assert_eq!(money(&sales[0]["price"]), dec!(5.50));
    assert_eq!(sales[1]["product_name"], "Amp");
    assert_eq!(sales[1]["quantity"], 2);
    assert_eq!(money(&sales[1]["price"]), dec!(20.00));
    assert_eq!(sales[1]["order_status"], "pending");
}

#[tokio::test]
async fn seller_dashboard_excludes_other_sellers_items() {
    let fx = fixture().await;

    let body = read_json(
        fx.app
            .request(
                Method::GET,
                "/seller/dashboard",
                None,
                Some(&fx.seller_two_token),
            )
            .await,
    )
    .await;

    let stats = &body["data"]["stats"];
    assert_eq!(stats["total_products"], 1);
    assert_eq!(stats["active_products"], 1);
    assert_eq!(money(&stats["total_sales"]), dec!(7.00));
    assert_eq!(stats["pending_items"], 1);

    let sales = body["data"]["recent_sales"].as_array().unwrap();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0]["product_name"], "Novel");
    assert_eq!(sales[0]["order_status"], "pending");
}
