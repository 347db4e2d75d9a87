use crate::{
    db::DbPool,
    entities::category::{self, Entity as CategoryEntity},
    entities::product::{self, Entity as ProductEntity},
    entities::user::{self, Entity as UserEntity},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::{Expr, Func},
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

/// Products shown per catalog page.
const PAGE_SIZE: u64 = 12;
/// Featured products on the home page.
const FEATURED_COUNT: u64 = 8;
/// Categories shown on the home page.
const HOME_CATEGORY_COUNT: usize = 6;
/// Related products on a product detail page.
const RELATED_COUNT: u64 = 4;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub page: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub price: Decimal,
    pub stock: i32,
    pub image_path: Option<String>,
    pub seller_name: String,
    pub category_name: String,
    pub category_slug: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CategoryWithCount {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub product_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductSummary>,
    /// Active categories for the filter bar.
    pub categories: Vec<CategorySummary>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductDetailResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub price: Decimal,
    pub stock: i32,
    pub image_path: Option<String>,
    pub seller: SellerSummary,
    pub category: CategorySummary,
    pub related: Vec<ProductSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SellerSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HomeResponse {
    pub featured: Vec<ProductSummary>,
    pub categories: Vec<CategoryWithCount>,
}

/// Public storefront queries: product listing, search, detail pages
/// and the home page. Only active products are ever returned.
#[derive(Clone)]
pub struct CatalogService {
    db: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Lists active products, newest first, 12 per page.
    ///
    /// `search` matches the name or description case-insensitively;
    /// `category` filters by exact category slug. An unknown slug
    /// yields an empty page rather than an error.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        query: CatalogQuery,
    ) -> Result<ProductListResponse, ServiceError> {
        let db = &*self.db;
        let page = query.page.unwrap_or(1).max(1);

        let mut condition = Condition::all().add(product::Column::IsActive.eq(true));

        if let Some(term) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            let pattern = format!("%{}%", term.to_lowercase());
            condition = condition.add(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(product::Column::Name)))
                            .like(pattern.clone()),
                    )
                    .add(Expr::expr(Func::lower(Expr::col(product::Column::Description))).like(pattern)),
            );
        }

        let mut unknown_category = false;
        if let Some(slug) = query.category.as_deref().filter(|s| !s.is_empty()) {
            match CategoryEntity::find()
                .filter(category::Column::Slug.eq(slug))
                .one(db)
                .await?
            {
                Some(cat) => condition = condition.add(product::Column::CategoryId.eq(cat.id)),
                None => unknown_category = true,
            }
        }

        let categories = self.filter_bar_categories().await?;

        if unknown_category {
            return Ok(ProductListResponse {
                products: Vec::new(),
                categories,
                total: 0,
                page,
                per_page: PAGE_SIZE,
            });
        }

        let paginator = ProductEntity::find()
            .filter(condition)
            .order_by_desc(product::Column::CreatedAt)
            .paginate(db, PAGE_SIZE);

        let total = paginator.num_items().await?;
        let models = paginator.fetch_page(page - 1).await?;
        let products = build_product_summaries(db, models).await?;

        Ok(ProductListResponse {
            products,
            categories,
            total,
            page,
            per_page: PAGE_SIZE,
        })
    }

    /// Fetches a product by slug with its seller, category and up to
    /// four related products from the same category. Inactive products
    /// are treated as missing.
    #[instrument(skip(self))]
    pub async fn get_product(&self, slug: &str) -> Result<ProductDetailResponse, ServiceError> {
        let db = &*self.db;

        let product = ProductEntity::find()
            .filter(product::Column::Slug.eq(slug))
            .one(db)
            .await?
            .filter(|p| p.is_active)
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let seller = UserEntity::find_by_id(product.seller_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Seller not found".to_string()))?;

        let category = CategoryEntity::find_by_id(product.category_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Category not found".to_string()))?;

        let related_models = ProductEntity::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::CategoryId.eq(product.category_id))
            .filter(product::Column::Id.ne(product.id))
            .order_by_desc(product::Column::CreatedAt)
            .limit(RELATED_COUNT)
            .all(db)
            .await?;
        let related = build_product_summaries(db, related_models).await?;

        Ok(ProductDetailResponse {
            id: product.id,
            name: product.name,
            slug: product.slug,
            description: product.description,
            price: product.price,
            stock: product.stock,
            image_path: product.image_path,
            seller: SellerSummary {
                id: seller.id,
                name: seller.name,
            },
            category: CategorySummary {
                id: category.id,
                name: category.name,
                slug: category.slug,
            },
            related,
            created_at: product.created_at,
        })
    }

    /// Home page data: the 8 newest active products plus up to 6
    /// active categories that have at least one active product, with
    /// live counts.
    #[instrument(skip(self))]
    pub async fn home(&self) -> Result<HomeResponse, ServiceError> {
        let db = &*self.db;

        let featured_models = ProductEntity::find()
            .filter(product::Column::IsActive.eq(true))
            .order_by_desc(product::Column::CreatedAt)
            .limit(FEATURED_COUNT)
            .all(db)
            .await?;
        let featured = build_product_summaries(db, featured_models).await?;

        let category_models = CategoryEntity::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::CreatedAt)
            .all(db)
            .await?;

        let mut categories = Vec::new();
        for cat in category_models {
            if categories.len() == HOME_CATEGORY_COUNT {
                break;
            }
            let product_count = ProductEntity::find()
                .filter(product::Column::CategoryId.eq(cat.id))
                .filter(product::Column::IsActive.eq(true))
                .count(db)
                .await?;
            if product_count == 0 {
                continue;
            }
            categories.push(CategoryWithCount {
                id: cat.id,
                name: cat.name,
                slug: cat.slug,
                product_count,
            });
        }

        Ok(HomeResponse {
            featured,
            categories,
        })
    }

    async fn filter_bar_categories(&self) -> Result<Vec<CategorySummary>, ServiceError> {
        Ok(CategoryEntity::find()
            .filter(category::Column::IsActive.eq(true))
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(|c| CategorySummary {
                id: c.id,
                name: c.name,
                slug: c.slug,
            })
            .collect())
    }
}

/// Attaches seller and category names to a batch of products with two
/// lookup queries instead of one pair per row.
pub(crate) async fn build_product_summaries<C>(
    db: &C,
    products: Vec<product::Model>,
) -> Result<Vec<ProductSummary>, ServiceError>
where
    C: ConnectionTrait,
{
    if products.is_empty() {
        return Ok(Vec::new());
    }

    let seller_ids: Vec<Uuid> = products.iter().map(|p| p.seller_id).collect();
    let category_ids: Vec<Uuid> = products.iter().map(|p| p.category_id).collect();

    let sellers: HashMap<Uuid, String> = UserEntity::find()
        .filter(user::Column::Id.is_in(seller_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u.name))
        .collect();

    let categories: HashMap<Uuid, (String, String)> = CategoryEntity::find()
        .filter(category::Column::Id.is_in(category_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|c| (c.id, (c.name, c.slug)))
        .collect();

    Ok(products
        .into_iter()
        .map(|p| {
            let (category_name, category_slug) =
                categories.get(&p.category_id).cloned().unwrap_or_default();
            ProductSummary {
                id: p.id,
                name: p.name,
                slug: p.slug,
                price: p.price,
                stock: p.stock,
                image_path: p.image_path,
                seller_name: sellers.get(&p.seller_id).cloned().unwrap_or_default(),
                category_name,
                category_slug,
                created_at: p.created_at,
            }
        })
        .collect())
}
