use crate::{
    db::DbPool,
    entities::category::Entity as CategoryEntity,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity},
    entities::user::{self, Entity as UserEntity, Role},
    errors::ServiceError,
    services::catalog::{build_product_summaries, ProductSummary},
    services::orders::{OrderResponse, OrderService},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminStats {
    pub total_users: u64,
    pub total_sellers: u64,
    pub total_buyers: u64,
    pub blocked_users: u64,
    pub total_products: u64,
    pub active_products: u64,
    pub total_orders: u64,
    pub pending_orders: u64,
    pub total_categories: u64,
    /// Σ total_amount over delivered orders.
    pub total_revenue: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub is_blocked: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminOrderRow {
    pub id: Uuid,
    pub order_number: String,
    pub buyer_name: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub item_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminDashboard {
    pub stats: AdminStats,
    pub recent_users: Vec<UserSummary>,
    pub recent_orders: Vec<AdminOrderRow>,
    pub recent_products: Vec<ProductSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BuyerStats {
    pub total: u64,
    pub pending: u64,
    pub delivered: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BuyerDashboard {
    pub stats: BuyerStats,
    pub recent_orders: Vec<OrderResponse>,
    /// Newest active products, shown as recommendations.
    pub featured: Vec<ProductSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SellerStats {
    pub total_products: u64,
    pub active_products: u64,
    /// Σ line prices over sold items of this seller's products.
    pub total_sales: Decimal,
    /// Sold items whose parent order is still pending.
    pub pending_items: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaleRow {
    pub order_item_id: Uuid,
    pub order_id: Uuid,
    pub order_number: String,
    pub order_status: OrderStatus,
    pub buyer_name: String,
    pub product_name: String,
    pub quantity: i32,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SellerDashboard {
    pub stats: SellerStats,
    pub recent_products: Vec<ProductSummary>,
    pub recent_sales: Vec<SaleRow>,
}

/// Role dashboards. Every number is computed live; there is no cache
/// to go stale.
#[derive(Clone)]
pub struct DashboardService {
    db: Arc<DbPool>,
    orders: Arc<OrderService>,
}

impl DashboardService {
    pub fn new(db: Arc<DbPool>, orders: Arc<OrderService>) -> Self {
        Self { db, orders }
    }

    #[instrument(skip(self))]
    pub async fn admin_dashboard(&self) -> Result<AdminDashboard, ServiceError> {
        let db = &*self.db;

        let stats = AdminStats {
            total_users: UserEntity::find().count(db).await?,
            total_sellers: UserEntity::find()
                .filter(user::Column::Role.eq(Role::Seller))
                .count(db)
                .await?,
            total_buyers: UserEntity::find()
                .filter(user::Column::Role.eq(Role::Buyer))
                .count(db)
                .await?,
            blocked_users: UserEntity::find()
                .filter(user::Column::IsBlocked.eq(true))
                .count(db)
                .await?,
            total_products: ProductEntity::find().count(db).await?,
            active_products: ProductEntity::find()
                .filter(product::Column::IsActive.eq(true))
                .count(db)
                .await?,
            total_orders: OrderEntity::find().count(db).await?,
            pending_orders: OrderEntity::find()
                .filter(order::Column::Status.eq(OrderStatus::Pending))
                .count(db)
                .await?,
            total_categories: CategoryEntity::find().count(db).await?,
            total_revenue: self.delivered_revenue().await?,
        };

        let recent_users = UserEntity::find()
            .order_by_desc(user::Column::CreatedAt)
            .limit(5)
            .all(db)
            .await?
            .into_iter()
            .map(|u| UserSummary {
                id: u.id,
                name: u.name,
                email: u.email,
                role: u.role,
                is_blocked: u.is_blocked,
                created_at: u.created_at,
            })
            .collect();

        let recent_orders = self.recent_orders_with_buyers().await?;

        let recent_product_models = ProductEntity::find()
            .order_by_desc(product::Column::CreatedAt)
            .limit(5)
            .all(db)
            .await?;
        let recent_products = build_product_summaries(db, recent_product_models).await?;

        Ok(AdminDashboard {
            stats,
            recent_users,
            recent_orders,
            recent_products,
        })
    }

    #[instrument(skip(self))]
    pub async fn buyer_dashboard(&self, buyer_id: Uuid) -> Result<BuyerDashboard, ServiceError> {
        let db = &*self.db;

        let own = OrderEntity::find().filter(order::Column::BuyerId.eq(buyer_id));
        let stats = BuyerStats {
            total: own.clone().count(db).await?,
            pending: own
                .clone()
                .filter(order::Column::Status.eq(OrderStatus::Pending))
                .count(db)
                .await?,
            delivered: own
                .filter(order::Column::Status.eq(OrderStatus::Delivered))
                .count(db)
                .await?,
        };

        let recent_orders = self.orders.recent_orders(buyer_id, 5).await?;

        let featured_models = ProductEntity::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .limit(8)
            .all(db)
            .await?;
        let featured = build_product_summaries(db, featured_models).await?;

        Ok(BuyerDashboard {
            stats,
            recent_orders,
            featured,
        })
    }

    #[instrument(skip(self))]
    pub async fn seller_dashboard(&self, seller_id: Uuid) -> Result<SellerDashboard, ServiceError> {
        let db = &*self.db;

        let stats = SellerStats {
            total_products: ProductEntity::find()
                .filter(product::Column::SellerId.eq(seller_id))
                .count(db)
                .await?,
            active_products: ProductEntity::find()
                .filter(product::Column::SellerId.eq(seller_id))
                .filter(product::Column::IsActive.eq(true))
                .count(db)
                .await?,
            total_sales: self.seller_sales_total(seller_id).await?,
            pending_items: OrderItemEntity::find()
                .join(JoinType::InnerJoin, order_item::Relation::Product.def())
                .join(JoinType::InnerJoin, order_item::Relation::Order.def())
                .filter(product::Column::SellerId.eq(seller_id))
                .filter(order::Column::Status.eq(OrderStatus::Pending))
                .count(db)
                .await?,
        };

        let recent_product_models = ProductEntity::find()
            .filter(product::Column::SellerId.eq(seller_id))
            .order_by_desc(product::Column::CreatedAt)
            .limit(5)
            .all(db)
            .await?;
        let recent_products = build_product_summaries(db, recent_product_models).await?;

        let recent_sales = self.recent_sales(seller_id).await?;

        Ok(SellerDashboard {
            stats,
            recent_products,
            recent_sales,
        })
    }

    async fn delivered_revenue(&self) -> Result<Decimal, ServiceError> {
        Ok(OrderEntity::find()
            .filter(order::Column::Status.eq(OrderStatus::Delivered))
            .select_only()
            .column_as(order::Column::TotalAmount.sum(), "revenue")
            .into_tuple::<Option<Decimal>>()
            .one(&*self.db)
            .await?
            .flatten()
            .unwrap_or(Decimal::ZERO))
    }

    async fn seller_sales_total(&self, seller_id: Uuid) -> Result<Decimal, ServiceError> {
        Ok(OrderItemEntity::find()
            .join(JoinType::InnerJoin, order_item::Relation::Product.def())
            .filter(product::Column::SellerId.eq(seller_id))
            .select_only()
            .column_as(order_item::Column::Price.sum(), "total")
            .into_tuple::<Option<Decimal>>()
            .one(&*self.db)
            .await?
            .flatten()
            .unwrap_or(Decimal::ZERO))
    }

    /// Latest 10 orders across all buyers with buyer names and item
    /// counts attached.
    async fn recent_orders_with_buyers(&self) -> Result<Vec<AdminOrderRow>, ServiceError> {
        let db = &*self.db;

        let orders = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .limit(10)
            .all(db)
            .await?;

        let buyer_ids: Vec<Uuid> = orders.iter().map(|o| o.buyer_id).collect();
        let buyers: HashMap<Uuid, String> = UserEntity::find()
            .filter(user::Column::Id.is_in(buyer_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let counts: HashMap<Uuid, i64> = OrderItemEntity::find()
            .filter(order_item::Column::OrderId.is_in(order_ids))
            .select_only()
            .column(order_item::Column::OrderId)
            .column_as(order_item::Column::Id.count(), "item_count")
            .group_by(order_item::Column::OrderId)
            .into_tuple::<(Uuid, i64)>()
            .all(db)
            .await?
            .into_iter()
            .collect();

        Ok(orders
            .into_iter()
            .map(|o| AdminOrderRow {
                id: o.id,
                order_number: o.order_number,
                buyer_name: buyers.get(&o.buyer_id).cloned().unwrap_or_default(),
                total_amount: o.total_amount,
                status: o.status,
                item_count: counts.get(&o.id).copied().unwrap_or(0),
                created_at: o.created_at,
            })
            .collect())
    }

    /// Latest 10 sold line items of this seller's products, with the
    /// parent order and the buyer attached.
    async fn recent_sales(&self, seller_id: Uuid) -> Result<Vec<SaleRow>, ServiceError> {
        let db = &*self.db;

        let rows = OrderItemEntity::find()
            .find_also_related(ProductEntity)
            .filter(product::Column::SellerId.eq(seller_id))
            .order_by_desc(order_item::Column::CreatedAt)
            .limit(10)
            .all(db)
            .await?;

        let order_ids: Vec<Uuid> = rows.iter().map(|(item, _)| item.order_id).collect();
        let orders: HashMap<Uuid, order::Model> = OrderEntity::find()
            .filter(order::Column::Id.is_in(order_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|o| (o.id, o))
            .collect();

        let buyer_ids: Vec<Uuid> = orders.values().map(|o| o.buyer_id).collect();
        let buyers: HashMap<Uuid, String> = UserEntity::find()
            .filter(user::Column::Id.is_in(buyer_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|u| (u.id, u.name))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|(item, product)| {
                let order = orders.get(&item.order_id)?;
                Some(SaleRow {
                    order_item_id: item.id,
                    order_id: order.id,
                    order_number: order.order_number.clone(),
                    order_status: order.status,
                    buyer_name: buyers.get(&order.buyer_id).cloned().unwrap_or_default(),
                    product_name: product.map(|p| p.name).unwrap_or_default(),
                    quantity: item.quantity,
                    price: item.price,
                    created_at: item.created_at,
                })
            })
            .collect())
    }
}
