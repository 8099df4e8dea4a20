use anyhow::Result;
use sea_orm::{ConnectOptions, Database};
use sea_orm_migration::prelude::*;
use std::time::Duration;
use tracing::{error, info};

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_purchase_requests_table::Migration),
            Box::new(m20240301_000002_create_material_items_table::Migration),
            Box::new(m20240301_000003_create_orders_table::Migration),
            Box::new(m20240301_000004_create_warehouse_stock_table::Migration),
            Box::new(m20240301_000005_create_audit_log_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_purchase_requests_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_purchase_requests_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(PurchaseRequests::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseRequests::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::RequestNumber)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(PurchaseRequests::Title).string().not_null())
                        .col(ColumnDef::new(PurchaseRequests::Department).string().null())
                        .col(
                            ColumnDef::new(PurchaseRequests::Currency)
                                .string_len(3)
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseRequests::Urgency).string().null())
                        .col(ColumnDef::new(PurchaseRequests::Site).string().null())
                        .col(ColumnDef::new(PurchaseRequests::Status).string().not_null())
                        .col(
                            ColumnDef::new(PurchaseRequests::RequestedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::OriginalRequestId)
                                .uuid()
                                .null(),
                        )
                        .col(ColumnDef::new(PurchaseRequests::ReturnOrderId).uuid().null())
                        .col(
                            ColumnDef::new(PurchaseRequests::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequests::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_purchase_requests_original_request_id")
                        .table(PurchaseRequests::Table)
                        .col(PurchaseRequests::OriginalRequestId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PurchaseRequestItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(PurchaseRequestItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequestItems::PurchaseRequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequestItems::MaterialName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PurchaseRequestItems::Unit).string().not_null())
                        .col(ColumnDef::new(PurchaseRequestItems::Brand).string().null())
                        .col(
                            ColumnDef::new(PurchaseRequestItems::Specifications)
                                .text()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequestItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(PurchaseRequestItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_purchase_request_items_request_id")
                                .from(
                                    PurchaseRequestItems::Table,
                                    PurchaseRequestItems::PurchaseRequestId,
                                )
                                .to(PurchaseRequests::Table, PurchaseRequests::Id)
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
                        .name("idx_purchase_request_items_request_id")
                        .table(PurchaseRequestItems::Table)
                        .col(PurchaseRequestItems::PurchaseRequestId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PurchaseRequestItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(PurchaseRequests::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum PurchaseRequests {
        Table,
        Id,
        RequestNumber,
        Title,
        Department,
        Currency,
        Urgency,
        Site,
        Status,
        RequestedBy,
        OriginalRequestId,
        ReturnOrderId,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum PurchaseRequestItems {
        Table,
        Id,
        PurchaseRequestId,
        MaterialName,
        Unit,
        Brand,
        Specifications,
        Quantity,
        CreatedAt,
    }
}

mod m20240301_000002_create_material_items_table {

    use super::m20240301_000001_create_purchase_requests_table::PurchaseRequests;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_material_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MaterialItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MaterialItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MaterialItems::PurchaseRequestId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MaterialItems::Name).string().not_null())
                        .col(ColumnDef::new(MaterialItems::Unit).string().not_null())
                        .col(ColumnDef::new(MaterialItems::Brand).string().null())
                        .col(ColumnDef::new(MaterialItems::Specifications).text().null())
                        .col(ColumnDef::new(MaterialItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(MaterialItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_material_items_request_id")
                                .from(MaterialItems::Table, MaterialItems::PurchaseRequestId)
                                .to(PurchaseRequests::Table, PurchaseRequests::Id)
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
                        .name("idx_material_items_request_id")
                        .table(MaterialItems::Table)
                        .col(MaterialItems::PurchaseRequestId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MaterialItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum MaterialItems {
        Table,
        Id,
        PurchaseRequestId,
        Name,
        Unit,
        Brand,
        Specifications,
        Quantity,
        CreatedAt,
    }
}

mod m20240301_000003_create_orders_table {

    use super::m20240301_000001_create_purchase_requests_table::PurchaseRequests;
    use super::m20240301_000002_create_material_items_table::MaterialItems;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create orders table aligned with entities::order Model
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
                        .col(ColumnDef::new(Orders::PurchaseRequestId).uuid().not_null())
                        .col(ColumnDef::new(Orders::MaterialItemId).uuid().not_null())
                        .col(ColumnDef::new(Orders::SupplierId).uuid().null())
                        .col(ColumnDef::new(Orders::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(Orders::ReturnedQuantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::ReorderDecision)
                                .string_len(32)
                                .not_null()
                                .default("unanswered"),
                        )
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string_len(32)
                                .not_null()
                                .default("pending"),
                        )
                        .col(ColumnDef::new(Orders::ReturnNotes).text().null())
                        .col(
                            ColumnDef::new(Orders::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_purchase_request_id")
                                .from(Orders::Table, Orders::PurchaseRequestId)
                                .to(PurchaseRequests::Table, PurchaseRequests::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_material_item_id")
                                .from(Orders::Table, Orders::MaterialItemId)
                                .to(MaterialItems::Table, MaterialItems::Id)
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
                        .name("idx_orders_purchase_request_id")
                        .table(Orders::Table)
                        .col(Orders::PurchaseRequestId)
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

            manager
                .create_table(
                    Table::create()
                        .table(OrderDeliveries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderDeliveries::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderDeliveries::OrderId).uuid().not_null())
                        .col(ColumnDef::new(OrderDeliveries::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderDeliveries::ReceivedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderDeliveries::DeliveredAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_deliveries_order_id")
                                .from(OrderDeliveries::Table, OrderDeliveries::OrderId)
                                .to(Orders::Table, Orders::Id)
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
                        .name("idx_order_deliveries_order_id")
                        .table(OrderDeliveries::Table)
                        .col(OrderDeliveries::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderDeliveries::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        OrderNumber,
        PurchaseRequestId,
        MaterialItemId,
        SupplierId,
        Quantity,
        ReturnedQuantity,
        ReorderDecision,
        Status,
        ReturnNotes,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderDeliveries {
        Table,
        Id,
        OrderId,
        Quantity,
        ReceivedBy,
        DeliveredAt,
    }
}

mod m20240301_000004_create_warehouse_stock_table {

    use super::m20240301_000002_create_material_items_table::MaterialItems;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_warehouse_stock_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(WarehouseStock::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(WarehouseStock::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::MaterialItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(WarehouseStock::WarehouseId).uuid().null())
                        .col(
                            ColumnDef::new(WarehouseStock::Quantity)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::ConditionBreakdown)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::Version)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(WarehouseStock::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_warehouse_stock_material_item_id")
                                .from(WarehouseStock::Table, WarehouseStock::MaterialItemId)
                                .to(MaterialItems::Table, MaterialItems::Id)
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
                        .name("idx_warehouse_stock_material_item_id")
                        .table(WarehouseStock::Table)
                        .col(WarehouseStock::MaterialItemId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CustodyAssignments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CustodyAssignments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustodyAssignments::StockRecordId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustodyAssignments::AssignedTo)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustodyAssignments::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustodyAssignments::CheckoutCondition)
                                .string_len(32)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustodyAssignments::Status)
                                .string_len(32)
                                .not_null()
                                .default("active"),
                        )
                        .col(
                            ColumnDef::new(CustodyAssignments::ReturnCondition)
                                .string_len(32)
                                .null(),
                        )
                        .col(ColumnDef::new(CustodyAssignments::Notes).text().null())
                        .col(
                            ColumnDef::new(CustodyAssignments::AssignedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustodyAssignments::AssignedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CustodyAssignments::ReturnedAt)
                                .timestamp_with_time_zone()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_custody_assignments_stock_record_id")
                                .from(CustodyAssignments::Table, CustodyAssignments::StockRecordId)
                                .to(WarehouseStock::Table, WarehouseStock::Id)
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
                        .name("idx_custody_assignments_stock_record_id")
                        .table(CustodyAssignments::Table)
                        .col(CustodyAssignments::StockRecordId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CustodyAssignments::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(WarehouseStock::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum WarehouseStock {
        Table,
        Id,
        MaterialItemId,
        WarehouseId,
        Quantity,
        ConditionBreakdown,
        Version,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum CustodyAssignments {
        Table,
        Id,
        StockRecordId,
        AssignedTo,
        Quantity,
        CheckoutCondition,
        Status,
        ReturnCondition,
        Notes,
        AssignedBy,
        AssignedAt,
        ReturnedAt,
    }
}

mod m20240301_000005_create_audit_log_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_audit_log_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // No foreign key: entries outlive the rows they describe
            manager
                .create_table(
                    Table::create()
                        .table(AuditLog::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(AuditLog::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(AuditLog::PurchaseRequestId).uuid().null())
                        .col(ColumnDef::new(AuditLog::ActionType).string().not_null())
                        .col(ColumnDef::new(AuditLog::PerformedBy).string().not_null())
                        .col(ColumnDef::new(AuditLog::Description).text().not_null())
                        .col(ColumnDef::new(AuditLog::Metadata).json().not_null())
                        .col(
                            ColumnDef::new(AuditLog::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_audit_log_purchase_request_id")
                        .table(AuditLog::Table)
                        .col(AuditLog::PurchaseRequestId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(AuditLog::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum AuditLog {
        Table,
        Id,
        PurchaseRequestId,
        ActionType,
        PerformedBy,
        Description,
        Metadata,
        CreatedAt,
    }
}

/// Connects to `db_url` and applies every pending migration.
pub async fn run_migration(db_url: &str) -> Result<()> {
    info!("Setting up database connection for migrations");

    let mut opt = ConnectOptions::new(db_url);
    opt.max_connections(5)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(300))
        .sqlx_logging(true);

    let db = Database::connect(opt).await?;

    info!("Running database migrations");

    match Migrator::up(&db, None).await {
        Ok(_) => {
            info!("Migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            error!("Migration failed: {}", e);
            Err(e.into())
        }
    }
}
