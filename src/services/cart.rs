use crate::{
    db::DbPool,
    entities::cart_item::{self, Entity as CartItemEntity},
    entities::category::{self, Entity as CategoryEntity},
    entities::product::Entity as ProductEntity,
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartInput {
    pub product_id: Uuid,
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartItemInput {
    #[validate(range(min = 1, message = "Quantity must be at least 1"))]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CartItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub unit_price: Decimal,
    pub stock: i32,
    pub image_path: Option<String>,
    pub seller_name: String,
    pub category_name: String,
    pub quantity: i32,
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    /// Σ quantity × current product price.
    pub total: Decimal,
}

/// Per-user shopping cart. One row per (user, product); adding an
/// already-carted product folds into the existing row. Stock is only
/// checked here as a courtesy; checkout re-verifies it atomically.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Adds a product to the cart, summing quantities when the product
    /// is already in it. The combined quantity must not exceed the
    /// current stock.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddToCartInput,
    ) -> Result<CartResponse, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let product = ProductEntity::find_by_id(input.product_id)
            .one(&txn)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let existing = CartItemEntity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::ProductId.eq(input.product_id))
            .one(&txn)
            .await?;

        let already_in_cart = existing.as_ref().map(|i| i.quantity).unwrap_or(0);
        if already_in_cart + input.quantity > product.stock {
            return Err(ServiceError::InsufficientStock(format!(
                "Not enough stock available for {}",
                product.name
            )));
        }

        match existing {
            Some(item) => {
                let new_quantity = item.quantity + input.quantity;
                let mut item: cart_item::ActiveModel = item.into();
                item.quantity = Set(new_quantity);
                item.update(&txn).await?;
            }
            None => {
                cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(input.product_id),
                    quantity: Set(input.quantity),
                    ..Default::default()
                }
                .insert(&txn)
                .await?;
            }
        }

        txn.commit().await?;

        self.event_sender
            .send(Event::CartItemAdded {
                user_id,
                product_id: input.product_id,
                quantity: input.quantity,
            })
            .await;

        info!(user_id = %user_id, product_id = %input.product_id, quantity = input.quantity, "Added item to cart");
        self.get_cart(user_id).await
    }

    /// Sets a cart item to an exact quantity (no summing).
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        user_id: Uuid,
        cart_item_id: Uuid,
        input: UpdateCartItemInput,
    ) -> Result<CartResponse, ServiceError> {
        input.validate()?;

        let txn = self.db.begin().await?;

        let item = CartItemEntity::find_by_id(cart_item_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        if item.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "This cart item belongs to another user".to_string(),
            ));
        }

        let product = ProductEntity::find_by_id(item.product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        if input.quantity > product.stock {
            return Err(ServiceError::InsufficientStock(format!(
                "Not enough stock available for {}",
                product.name
            )));
        }

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(input.quantity);
        item.update(&txn).await?;

        txn.commit().await?;

        self.event_sender
            .send(Event::CartItemUpdated {
                user_id,
                cart_item_id,
                quantity: input.quantity,
            })
            .await;

        self.get_cart(user_id).await
    }

    /// Removes a cart item owned by the user.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, user_id: Uuid, cart_item_id: Uuid) -> Result<(), ServiceError> {
        let item = CartItemEntity::find_by_id(cart_item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Cart item not found".to_string()))?;

        if item.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "This cart item belongs to another user".to_string(),
            ));
        }

        item.delete(&*self.db).await?;

        self.event_sender
            .send(Event::CartItemRemoved {
                user_id,
                cart_item_id,
            })
            .await;

        info!(user_id = %user_id, cart_item_id = %cart_item_id, "Removed cart item");
        Ok(())
    }

    /// Returns the cart with product, seller and category data attached
    /// and the running total at current prices.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<CartResponse, ServiceError> {
        let db = &*self.db;

        let rows = CartItemEntity::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .find_also_related(ProductEntity)
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(db)
            .await?;

        let seller_ids: Vec<Uuid> = rows
            .iter()
            .filter_map(|(_, p)| p.as_ref().map(|p| p.seller_id))
            .collect();
        let category_ids: Vec<Uuid> = rows
            .iter()
            .filter_map(|(_, p)| p.as_ref().map(|p| p.category_id))
            .collect();

        let sellers: HashMap<Uuid, String> = UserEntity::find()
            .filter(user::Column::Id.is_in(seller_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let categories: HashMap<Uuid, String> = CategoryEntity::find()
            .filter(category::Column::Id.is_in(category_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let mut items = Vec::new();
        let mut total = Decimal::ZERO;
        for (item, product) in rows {
            let Some(product) = product else { continue };
            let line_total = product.price * Decimal::from(item.quantity);
            total += line_total;
            items.push(CartItemResponse {
                id: item.id,
                product_id: product.id,
                product_name: product.name,
                product_slug: product.slug,
                unit_price: product.price,
                stock: product.stock,
                image_path: product.image_path,
                seller_name: sellers.get(&product.seller_id).cloned().unwrap_or_default(),
                category_name: categories
                    .get(&product.category_id)
                    .cloned()
                    .unwrap_or_default(),
                quantity: item.quantity,
                line_total,
            });
        }

        Ok(CartResponse { items, total })
    }
}
