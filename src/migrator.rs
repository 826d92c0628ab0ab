use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_reference_tables::Migration),
            Box::new(m20240101_000002_create_stock_tables::Migration),
            Box::new(m20240101_000003_create_order_tables::Migration),
            Box::new(m20240101_000004_create_settlement_tables::Migration),
            Box::new(m20240101_000005_create_damage_return_tables::Migration),
            Box::new(m20240101_000006_create_audit_log_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240101_000001_create_reference_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_reference_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ProductVariants::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ProductVariants::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(ProductVariants::ProductId).uuid().not_null())
                        .col(ColumnDef::new(ProductVariants::Name).string().not_null())
                        .col(
                            ColumnDef::new(ProductVariants::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Units::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Units::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Units::Abbreviation)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Units::Name).string().not_null())
                        .col(ColumnDef::new(Units::Multiplier).integer().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Dsrs::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Dsrs::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Dsrs::Name).string().not_null())
                        .col(ColumnDef::new(Dsrs::Phone).string().null())
                        .col(
                            ColumnDef::new(Dsrs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Routes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Routes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Routes::Name).string().not_null())
                        .col(
                            ColumnDef::new(Routes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Routes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Dsrs::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Units::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(ProductVariants::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum ProductVariants {
        Table,
        Id,
        ProductId,
        Name,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Units {
        Table,
        Id,
        Abbreviation,
        Name,
        Multiplier,
    }

    #[derive(Iden)]
    enum Dsrs {
        Table,
        Id,
        Name,
        Phone,
        CreatedAt,
    }

    #[derive(Iden)]
    enum Routes {
        Table,
        Id,
        Name,
        CreatedAt,
    }
}

mod m20240101_000002_create_stock_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_stock_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(StockBatches::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockBatches::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockBatches::VariantId).uuid().not_null())
                        .col(
                            ColumnDef::new(StockBatches::SupplierPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockBatches::SellPrice).decimal().not_null())
                        .col(
                            ColumnDef::new(StockBatches::InitialQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBatches::RemainingQuantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockBatches::InitialFreeQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockBatches::RemainingFreeQty)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(StockBatches::ReceivedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_stock_batches_variant")
                        .table(StockBatches::Table)
                        .col(StockBatches::VariantId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(SupplierPurchases::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(SupplierPurchases::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(SupplierPurchases::BatchId).uuid().not_null())
                        .col(
                            ColumnDef::new(SupplierPurchases::VariantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierPurchases::SupplierName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierPurchases::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierPurchases::FreeQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(SupplierPurchases::UnitCost)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierPurchases::TotalCost)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(SupplierPurchases::PurchasedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(StockAdjustments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(StockAdjustments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockAdjustments::VariantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(StockAdjustments::BatchId).uuid().null())
                        .col(
                            ColumnDef::new(StockAdjustments::AdjustmentType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockAdjustments::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(StockAdjustments::FreeQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(StockAdjustments::OrderId).uuid().null())
                        .col(ColumnDef::new(StockAdjustments::ReturnId).uuid().null())
                        .col(ColumnDef::new(StockAdjustments::Note).string().null())
                        .col(
                            ColumnDef::new(StockAdjustments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(StockAdjustments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(SupplierPurchases::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(StockBatches::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum StockBatches {
        Table,
        Id,
        VariantId,
        SupplierPrice,
        SellPrice,
        InitialQuantity,
        RemainingQuantity,
        InitialFreeQty,
        RemainingFreeQty,
        ReceivedAt,
    }

    #[derive(Iden)]
    enum SupplierPurchases {
        Table,
        Id,
        BatchId,
        VariantId,
        SupplierName,
        Quantity,
        FreeQuantity,
        UnitCost,
        TotalCost,
        PurchasedAt,
    }

    #[derive(Iden)]
    enum StockAdjustments {
        Table,
        Id,
        VariantId,
        BatchId,
        AdjustmentType,
        Quantity,
        FreeQuantity,
        OrderId,
        ReturnId,
        Note,
        CreatedAt,
    }
}

mod m20240101_000003_create_order_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_order_tables"
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
                        .col(ColumnDef::new(Orders::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Orders::DsrId).uuid().not_null())
                        .col(ColumnDef::new(Orders::RouteId).uuid().not_null())
                        .col(
                            ColumnDef::new(Orders::OrderDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::Subtotal)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::Discount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::Total).decimal().not_null().default(0))
                        .col(
                            ColumnDef::new(Orders::PaidAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::PaymentStatus).string().not_null())
                        .col(ColumnDef::new(Orders::Status).string().not_null())
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_orders_order_date")
                        .table(Orders::Table)
                        .col(Orders::OrderDate)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::BatchId).uuid().not_null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(ColumnDef::new(OrderItems::Unit).string().not_null())
                        .col(
                            ColumnDef::new(OrderItems::FreeQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::ExtraPieces)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(OrderItems::SalePrice).decimal().not_null())
                        .col(
                            ColumnDef::new(OrderItems::Discount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(OrderItems::Subtotal).decimal().not_null())
                        .col(ColumnDef::new(OrderItems::Net).decimal().not_null())
                        .col(
                            ColumnDef::new(OrderItems::TotalQuantity)
                                .integer()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_order_items_order")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        DsrId,
        RouteId,
        OrderDate,
        Subtotal,
        Discount,
        Total,
        PaidAmount,
        PaymentStatus,
        Status,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        BatchId,
        Quantity,
        Unit,
        FreeQuantity,
        ExtraPieces,
        SalePrice,
        Discount,
        Subtotal,
        Net,
        TotalQuantity,
    }
}

mod m20240101_000004_create_settlement_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_settlement_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderItemReturns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItemReturns::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItemReturns::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderItemReturns::OrderItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItemReturns::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItemReturns::ReturnAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItemReturns::AdjustmentDiscount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItemReturns::Restocked)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(OrderItemReturns::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderCustomerDues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderCustomerDues::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderCustomerDues::OrderId).uuid().not_null())
                        .col(
                            ColumnDef::new(OrderCustomerDues::CustomerName)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderCustomerDues::Amount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderCustomerDues::CollectedAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderCustomerDues::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderCustomerDues::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderDsrDues::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderDsrDues::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderDsrDues::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderDsrDues::DsrId).uuid().not_null())
                        .col(ColumnDef::new(OrderDsrDues::Amount).decimal().not_null())
                        .col(
                            ColumnDef::new(OrderDsrDues::CollectedAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderDsrDues::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderDsrDues::UpdatedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderPayments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderPayments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderPayments::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderPayments::Amount).decimal().not_null())
                        .col(ColumnDef::new(OrderPayments::Method).string().null())
                        .col(
                            ColumnDef::new(OrderPayments::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderExpenses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderExpenses::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderExpenses::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderExpenses::Amount).decimal().not_null())
                        .col(ColumnDef::new(OrderExpenses::Reason).string().null())
                        .col(
                            ColumnDef::new(OrderExpenses::RecordedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderExpenses::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderPayments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderDsrDues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderCustomerDues::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(OrderItemReturns::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum OrderItemReturns {
        Table,
        Id,
        OrderId,
        OrderItemId,
        Quantity,
        ReturnAmount,
        AdjustmentDiscount,
        Restocked,
        CreatedAt,
    }

    #[derive(Iden)]
    enum OrderCustomerDues {
        Table,
        Id,
        OrderId,
        CustomerName,
        Amount,
        CollectedAmount,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum OrderDsrDues {
        Table,
        Id,
        OrderId,
        DsrId,
        Amount,
        CollectedAmount,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(Iden)]
    enum OrderPayments {
        Table,
        Id,
        OrderId,
        Amount,
        Method,
        RecordedAt,
    }

    #[derive(Iden)]
    enum OrderExpenses {
        Table,
        Id,
        OrderId,
        Amount,
        Reason,
        RecordedAt,
    }
}

mod m20240101_000005_create_damage_return_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000005_create_damage_return_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(DamageReturns::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DamageReturns::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DamageReturns::ReturnNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(DamageReturns::Status).string().not_null())
                        .col(
                            ColumnDef::new(DamageReturns::TotalAmount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(DamageReturns::Notes).string().null())
                        .col(
                            ColumnDef::new(DamageReturns::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DamageReturns::ApprovedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .col(ColumnDef::new(DamageReturns::ApprovedBy).uuid().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(DamageReturnItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DamageReturnItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DamageReturnItems::DamageReturnId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DamageReturnItems::VariantId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DamageReturnItems::BatchId).uuid().null())
                        .col(
                            ColumnDef::new(DamageReturnItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DamageReturnItems::UnitPrice)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DamageReturnItems::Condition)
                                .string()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DamageReturnItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(DamageReturns::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum DamageReturns {
        Table,
        Id,
        ReturnNumber,
        Status,
        TotalAmount,
        Notes,
        CreatedAt,
        ApprovedAt,
        ApprovedBy,
    }

    #[derive(Iden)]
    enum DamageReturnItems {
        Table,
        Id,
        DamageReturnId,
        VariantId,
        BatchId,
        Quantity,
        UnitPrice,
        Condition,
    }
}

mod m20240101_000006_create_audit_log_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000006_create_audit_log_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(AuditLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(AuditLogs::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(AuditLogs::Action).string().not_null())
                        .col(ColumnDef::new(AuditLogs::EntityType).string().not_null())
                        .col(ColumnDef::new(AuditLogs::EntityId).uuid().not_null())
                        .col(ColumnDef::new(AuditLogs::EntityName).string().not_null())
                        .col(ColumnDef::new(AuditLogs::OldValue).text().null())
                        .col(ColumnDef::new(AuditLogs::NewValue).text().null())
                        .col(
                            ColumnDef::new(AuditLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuditLogs::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum AuditLogs {
        Table,
        Id,
        Action,
        EntityType,
        EntityId,
        EntityName,
        OldValue,
        NewValue,
        CreatedAt,
    }
}
