use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus, PaymentMethod},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::Entity as ProductEntity,
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Orders shown per history page.
const PAGE_SIZE: u64 = 10;

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemResponse {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub product_slug: String,
    pub quantity: i32,
    /// Line price frozen at checkout.
    pub price: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_proof_path: Option<String>,
    pub shipping_address: String,
    pub phone: String,
    pub notes: Option<String>,
    pub item_count: usize,
    pub items: Vec<OrderItemResponse>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Read side of order history. Buyers only ever see their own orders;
/// writes happen exclusively through checkout.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Lists the buyer's orders, newest first, 10 per page, with line
    /// items attached.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        buyer_id: Uuid,
        page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let db = &*self.db;
        let page = page.max(1);

        let paginator = OrderEntity::find()
            .filter(order::Column::BuyerId.eq(buyer_id))
            .order_by_desc(order::Column::CreatedAt)
            .paginate(db, PAGE_SIZE);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page - 1).await?;
        let orders = self.attach_items(orders).await?;

        info!(buyer_id = %buyer_id, total = total, page = page, "Listed orders");

        Ok(OrderListResponse {
            orders,
            total,
            page,
            per_page: PAGE_SIZE,
        })
    }

    /// The buyer's most recent orders with items, for dashboard use.
    #[instrument(skip(self))]
    pub async fn recent_orders(
        &self,
        buyer_id: Uuid,
        limit: u64,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let orders = OrderEntity::find()
            .filter(order::Column::BuyerId.eq(buyer_id))
            .order_by_desc(order::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?;
        self.attach_items(orders).await
    }

    /// Fetches one order with its items. Orders belonging to another
    /// buyer are rejected, not hidden.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        buyer_id: Uuid,
        order_id: Uuid,
    ) -> Result<OrderResponse, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Order not found".to_string()))?;

        if order.buyer_id != buyer_id {
            return Err(ServiceError::Forbidden(
                "This order belongs to another buyer".to_string(),
            ));
        }

        let mut orders = self.attach_items(vec![order]).await?;
        // attach_items preserves input length
        orders.pop().ok_or_else(|| {
            ServiceError::Other(anyhow::anyhow!("order vanished while loading items"))
        })
    }

    /// Loads all line items for a batch of orders in two queries and
    /// folds them into responses.
    async fn attach_items(
        &self,
        orders: Vec<OrderModel>,
    ) -> Result<Vec<OrderResponse>, ServiceError> {
        let db = &*self.db;

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let item_rows = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .find_also_related(ProductEntity)
            .all(db)
            .await?;

        let mut items_by_order: HashMap<Uuid, Vec<OrderItemResponse>> = HashMap::new();
        for (item, product) in item_rows {
            let (product_name, product_slug) = product
                .map(|p| (p.name, p.slug))
                .unwrap_or_default();
            items_by_order
                .entry(item.order_id)
                .or_default()
                .push(OrderItemResponse {
                    id: item.id,
                    product_id: item.product_id,
                    product_name,
                    product_slug,
                    quantity: item.quantity,
                    price: item.price,
                });
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                OrderResponse {
                    id: order.id,
                    order_number: order.order_number,
                    total_amount: order.total_amount,
                    status: order.status,
                    payment_method: order.payment_method,
                    payment_proof_path: order.payment_proof_path,
                    shipping_address: order.shipping_address,
                    phone: order.phone,
                    notes: order.notes,
                    item_count: items.len(),
                    items,
                    created_at: order.created_at,
                }
            })
            .collect())
    }
}
