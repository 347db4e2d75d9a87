//! Embedded schema migrations, applied by `db::run_migrations`.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250310_000001_create_users::Migration),
            Box::new(m20250310_000002_create_categories::Migration),
            Box::new(m20250310_000003_create_products::Migration),
            Box::new(m20250310_000004_create_cart_items::Migration),
            Box::new(m20250310_000005_create_orders::Migration),
            Box::new(m20250310_000006_create_order_items::Migration),
        ]
    }
}

mod m20250310_000001_create_users {
    use sea_orm_migration::{prelude::*, schema::*};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250310_000001_create_users"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(pk_uuid(Users::Id))
                        .col(string(Users::Name))
                        .col(string(Users::Email))
                        .col(string(Users::PasswordHash))
                        .col(string_len(Users::Role, 20).default("buyer"))
                        .col(boolean(Users::IsBlocked).default(false))
                        .col(timestamp_with_time_zone(Users::CreatedAt))
                        .col(timestamp_with_time_zone(Users::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("idx_users_email")
                        .table(Users::Table)
                        .col(Users::Email)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_role")
                        .table(Users::Table)
                        .col(Users::Role)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Name,
        Email,
        PasswordHash,
        Role,
        IsBlocked,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250310_000002_create_categories {
    use sea_orm_migration::{prelude::*, schema::*};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250310_000002_create_categories"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(pk_uuid(Categories::Id))
                        .col(string(Categories::Name))
                        .col(string(Categories::Slug))
                        .col(text_null(Categories::Description))
                        .col(boolean(Categories::IsActive).default(true))
                        .col(timestamp_with_time_zone(Categories::CreatedAt))
                        .col(timestamp_with_time_zone(Categories::UpdatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("idx_categories_slug")
                        .table(Categories::Table)
                        .col(Categories::Slug)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Categories {
        Table,
        Id,
        Name,
        Slug,
        Description,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250310_000003_create_products {
    use super::m20250310_000001_create_users::Users;
    use super::m20250310_000002_create_categories::Categories;
    use sea_orm_migration::{prelude::*, schema::*};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250310_000003_create_products"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(pk_uuid(Products::Id))
                        .col(uuid(Products::SellerId))
                        .col(uuid(Products::CategoryId))
                        .col(string(Products::Name))
                        .col(string(Products::Slug))
                        .col(text(Products::Description))
                        .col(decimal_len(Products::Price, 10, 2))
                        .col(integer(Products::Stock).default(0))
                        .col(string_null(Products::ImagePath))
                        .col(boolean(Products::IsActive).default(true))
                        .col(timestamp_with_time_zone(Products::CreatedAt))
                        .col(timestamp_with_time_zone(Products::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_seller_id")
                                .from(Products::Table, Products::SellerId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_category_id")
                                .from(Products::Table, Products::CategoryId)
                                .to(Categories::Table, Categories::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("idx_products_slug")
                        .table(Products::Table)
                        .col(Products::Slug)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_seller_id")
                        .table(Products::Table)
                        .col(Products::SellerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_category_id")
                        .table(Products::Table)
                        .col(Products::CategoryId)
                        .to_owned(),
                )
                .await?;

            // Catalog listing filters on is_active and sorts newest-first
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_active_created_at")
                        .table(Products::Table)
                        .col(Products::IsActive)
                        .col(Products::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Products {
        Table,
        Id,
        SellerId,
        CategoryId,
        Name,
        Slug,
        Description,
        Price,
        Stock,
        ImagePath,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250310_000004_create_cart_items {
    use super::m20250310_000001_create_users::Users;
    use super::m20250310_000003_create_products::Products;
    use sea_orm_migration::{prelude::*, schema::*};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250310_000004_create_cart_items"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CartItems::Table)
                        .if_not_exists()
                        .col(pk_uuid(CartItems::Id))
                        .col(uuid(CartItems::UserId))
                        .col(uuid(CartItems::ProductId))
                        .col(integer(CartItems::Quantity))
                        .col(timestamp_with_time_zone(CartItems::CreatedAt))
                        .col(timestamp_with_time_zone(CartItems::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_user_id")
                                .from(CartItems::Table, CartItems::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_cart_items_product_id")
                                .from(CartItems::Table, CartItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // One cart row per (user, product); adds fold into the existing row
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("idx_cart_items_user_product")
                        .table(CartItems::Table)
                        .col(CartItems::UserId)
                        .col(CartItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CartItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum CartItems {
        Table,
        Id,
        UserId,
        ProductId,
        Quantity,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250310_000005_create_orders {
    use super::m20250310_000001_create_users::Users;
    use sea_orm_migration::{prelude::*, schema::*};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250310_000005_create_orders"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(pk_uuid(Orders::Id))
                        .col(uuid(Orders::BuyerId))
                        .col(string(Orders::OrderNumber))
                        .col(decimal_len(Orders::TotalAmount, 10, 2))
                        .col(string_len(Orders::PaymentMethod, 20))
                        .col(string_null(Orders::PaymentProofPath))
                        .col(string_len(Orders::Status, 20).default("pending"))
                        .col(text(Orders::ShippingAddress))
                        .col(string_len(Orders::Phone, 20))
                        .col(text_null(Orders::Notes))
                        .col(timestamp_with_time_zone(Orders::CreatedAt))
                        .col(timestamp_with_time_zone(Orders::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_buyer_id")
                                .from(Orders::Table, Orders::BuyerId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .unique()
                        .name("idx_orders_order_number")
                        .table(Orders::Table)
                        .col(Orders::OrderNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_buyer_id")
                        .table(Orders::Table)
                        .col(Orders::BuyerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            // Buyer order history sorts newest-first within one buyer
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_buyer_created_at")
                        .table(Orders::Table)
                        .col(Orders::BuyerId)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        BuyerId,
        OrderNumber,
        TotalAmount,
        PaymentMethod,
        PaymentProofPath,
        Status,
        ShippingAddress,
        Phone,
        Notes,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250310_000006_create_order_items {
    use super::m20250310_000003_create_products::Products;
    use super::m20250310_000005_create_orders::Orders;
    use sea_orm_migration::{prelude::*, schema::*};

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250310_000006_create_order_items"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(pk_uuid(OrderItems::Id))
                        .col(uuid(OrderItems::OrderId))
                        .col(uuid(OrderItems::ProductId))
                        .col(integer(OrderItems::Quantity))
                        .col(decimal_len(OrderItems::Price, 10, 2))
                        .col(timestamp_with_time_zone(OrderItems::CreatedAt))
                        .col(timestamp_with_time_zone(OrderItems::UpdatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        // Order history must survive catalog cleanup
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_product_id")
                                .from(OrderItems::Table, OrderItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_product_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        Quantity,
        Price,
        CreatedAt,
        UpdatedAt,
    }
}
