use crate::{
    db::DbPool,
    entities::cart_item::{self, Entity as CartItemEntity},
    entities::order::{self, Entity as OrderEntity, OrderStatus, PaymentMethod},
    entities::order_item,
    entities::product::{self, Entity as ProductEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::cart::{CartResponse, CartService},
};
use anyhow::anyhow;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Attempts at drawing an unused order number before giving up.
const ORDER_NUMBER_ATTEMPTS: usize = 5;
/// Upper bound on a decoded payment proof.
const MAX_PROOF_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Deserialize, Validate)]
pub struct PlaceOrderInput {
    #[validate(length(min = 1, message = "Shipping address is required"))]
    pub shipping_address: String,
    #[validate(length(min = 1, max = 20, message = "Phone must be between 1 and 20 characters"))]
    pub phone: String,
    pub payment_method: PaymentMethod,
    pub payment_proof: Option<PaymentProofUpload>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentProofUpload {
    pub filename: String,
    /// Base64-encoded file content.
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderConfirmation {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_proof_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub items: Vec<ConfirmationItem>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConfirmationItem {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Line price: unit price × quantity, frozen at checkout.
    pub price: Decimal,
}

/// Converts a cart into an immutable order.
///
/// The whole conversion runs in one database transaction. Stock is
/// taken with a conditional decrement (`stock >= quantity` in the
/// WHERE clause), so two buyers racing for the last unit cannot both
/// succeed: the loser's update matches zero rows and the transaction
/// rolls back. Payment proofs are written to disk before the
/// transaction opens; a storage failure aborts checkout with no order
/// persisted.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    cart: Arc<CartService>,
    uploads_dir: PathBuf,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        cart: Arc<CartService>,
        uploads_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            event_sender,
            cart,
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Checkout preview: the cart exactly as it would be ordered.
    #[instrument(skip(self))]
    pub async fn preview(&self, buyer_id: Uuid) -> Result<CartResponse, ServiceError> {
        let cart = self.cart.get_cart(buyer_id).await?;
        if cart.items.is_empty() {
            return Err(ServiceError::EmptyCart);
        }
        Ok(cart)
    }

    /// Places an order from the buyer's cart.
    ///
    /// On success the cart is empty, stock is decremented by the
    /// purchased quantities and the order with its line items exists.
    /// On any failure nothing is persisted.
    #[instrument(skip(self, input), fields(buyer_id = %buyer_id, payment_method = ?input.payment_method))]
    pub async fn place_order(
        &self,
        buyer_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<OrderConfirmation, ServiceError> {
        input.validate()?;
        if input.payment_method.requires_proof() && input.payment_proof.is_none() {
            return Err(ServiceError::ValidationError(
                "Payment proof is required for bank transfer".to_string(),
            ));
        }

        let db = &*self.db;

        let cart_rows = CartItemEntity::find()
            .filter(cart_item::Column::UserId.eq(buyer_id))
            .count(db)
            .await?;
        if cart_rows == 0 {
            return Err(ServiceError::EmptyCart);
        }

        let payment_proof_path = match (&input.payment_method, &input.payment_proof) {
            (PaymentMethod::BankTransfer, Some(upload)) => {
                Some(self.store_payment_proof(upload).await?)
            }
            _ => None,
        };

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, buyer_id = %buyer_id, "Failed to start checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        // Cart and prices are re-read inside the transaction; the
        // preview the buyer saw may already be stale.
        let rows = CartItemEntity::find()
            .filter(cart_item::Column::UserId.eq(buyer_id))
            .find_also_related(ProductEntity)
            .all(&txn)
            .await?;

        if rows.is_empty() {
            return Err(ServiceError::EmptyCart);
        }

        let mut total = Decimal::ZERO;
        let mut items = Vec::with_capacity(rows.len());
        for (item, product) in rows {
            let product = product.ok_or_else(|| {
                ServiceError::NotFound("A product in the cart no longer exists".to_string())
            })?;
            let price = product.price * Decimal::from(item.quantity);
            total += price;
            items.push(ConfirmationItem {
                product_id: product.id,
                product_name: product.name,
                quantity: item.quantity,
                price,
            });
        }

        let order_id = Uuid::new_v4();
        let order_number = self.allocate_order_number(&txn).await?;
        let now = Utc::now();

        let order_model = order::ActiveModel {
            id: Set(order_id),
            buyer_id: Set(buyer_id),
            order_number: Set(order_number.clone()),
            total_amount: Set(total),
            payment_method: Set(input.payment_method),
            payment_proof_path: Set(payment_proof_path),
            status: Set(OrderStatus::Pending),
            shipping_address: Set(input.shipping_address),
            phone: Set(input.phone),
            notes: Set(input.notes),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to insert order");
            ServiceError::DatabaseError(e)
        })?;

        for item in &items {
            let updated = ProductEntity::update_many()
                .col_expr(
                    product::Column::Stock,
                    Expr::col(product::Column::Stock).sub(item.quantity),
                )
                .col_expr(product::Column::UpdatedAt, Expr::value(now).into())
                .filter(product::Column::Id.eq(item.product_id))
                .filter(product::Column::Stock.gte(item.quantity))
                .exec(&txn)
                .await?;

            // Zero rows means a concurrent checkout claimed the stock
            // between our read and this update.
            if updated.rows_affected == 0 {
                warn!(product_id = %item.product_id, "Stock exhausted during checkout");
                return Err(ServiceError::InsufficientStock(format!(
                    "Not enough stock available for {}",
                    item.product_name
                )));
            }

            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                quantity: Set(item.quantity),
                price: Set(item.price),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        CartItemEntity::delete_many()
            .filter(cart_item::Column::UserId.eq(buyer_id))
            .exec(&txn)
            .await?;

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = %order_id, "Failed to commit checkout transaction");
            ServiceError::DatabaseError(e)
        })?;

        info!(
            order_id = %order_id,
            order_number = %order_number,
            buyer_id = %buyer_id,
            total = %total,
            "Order placed"
        );

        self.event_sender
            .send(Event::OrderPlaced {
                order_id,
                buyer_id,
                order_number,
                total_amount: total,
                item_count: items.len(),
            })
            .await;

        Ok(OrderConfirmation {
            id: order_model.id,
            order_number: order_model.order_number,
            total_amount: order_model.total_amount,
            status: order_model.status,
            payment_method: order_model.payment_method,
            payment_proof_path: order_model.payment_proof_path,
            created_at: order_model.created_at,
            items,
        })
    }

    /// Draws `ORD-`-prefixed numbers until one is free in the orders
    /// table. The keyspace is 36^10, so more than one retry is already
    /// a sign something is wrong.
    async fn allocate_order_number<C>(&self, db: &C) -> Result<String, ServiceError>
    where
        C: ConnectionTrait,
    {
        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let candidate = generate_order_number();
            let taken = OrderEntity::find()
                .filter(order::Column::OrderNumber.eq(candidate.as_str()))
                .count(db)
                .await?
                > 0;
            if !taken {
                return Ok(candidate);
            }
        }
        Err(ServiceError::Other(anyhow!(
            "could not allocate a unique order number after {} attempts",
            ORDER_NUMBER_ATTEMPTS
        )))
    }

    /// Decodes and stores a payment proof under
    /// `<uploads_dir>/payment_proofs/`, returning the relative path.
    async fn store_payment_proof(
        &self,
        upload: &PaymentProofUpload,
    ) -> Result<String, ServiceError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(upload.content.as_bytes())
            .map_err(|_| {
                ServiceError::ValidationError("Payment proof is not valid base64".to_string())
            })?;

        if bytes.is_empty() {
            return Err(ServiceError::ValidationError(
                "Payment proof is empty".to_string(),
            ));
        }
        if bytes.len() > MAX_PROOF_BYTES {
            return Err(ServiceError::ValidationError(
                "Payment proof must not exceed 2 MB".to_string(),
            ));
        }

        let file_name = format!("{}.{}", Uuid::new_v4(), sanitize_extension(&upload.filename));
        let dir = self.uploads_dir.join("payment_proofs");

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            error!(error = %e, dir = %dir.display(), "Failed to create payment proof directory");
            ServiceError::StorageError(e.to_string())
        })?;

        let path = dir.join(&file_name);
        tokio::fs::write(&path, &bytes).await.map_err(|e| {
            error!(error = %e, path = %path.display(), "Failed to write payment proof");
            ServiceError::StorageError(e.to_string())
        })?;

        Ok(format!("payment_proofs/{}", file_name))
    }
}

/// `ORD-` plus 10 uppercase alphanumeric characters.
fn generate_order_number() -> String {
    let suffix: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(|b| (b as char).to_ascii_uppercase())
        .collect();
    format!("ORD-{}", suffix)
}

/// Keeps a short alphanumeric extension from the uploaded filename;
/// anything else becomes `bin`.
fn sanitize_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use test_case::test_case;

    #[test]
    fn order_number_format() {
        let number = generate_order_number();
        assert!(number.starts_with("ORD-"));

        let suffix = &number["ORD-".len()..];
        assert_eq!(suffix.len(), 10);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn order_numbers_do_not_collide_in_bulk() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate_order_number()), "duplicate order number");
        }
    }

    #[test_case("proof.png", "png")]
    #[test_case("PROOF.JPG", "jpg"; "lowercased")]
    #[test_case("archive.tar.gz", "gz")]
    #[test_case("no_extension", "bin")]
    #[test_case("weird.p;g", "bin"; "rejects non alphanumeric")]
    #[test_case("dotfile.", "bin")]
    fn extension_sanitising(filename: &str, expected: &str) {
        assert_eq!(sanitize_extension(filename), expected);
    }
}
