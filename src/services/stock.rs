use crate::{
    commands::{
        inventory::{
            load_stock_record, AdjustStockCommand, CheckoutCustodyCommand,
            CreateStockRecordCommand, ReturnCustodyCommand,
        },
        Command,
    },
    db::DbPool,
    entities::{custody_assignment, material_item, warehouse_stock},
    errors::ServiceError,
    events::EventSender,
    models::ConditionBreakdown,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

/// A stock record with its breakdown already parsed.
#[derive(Debug, Clone)]
pub struct StockRecordView {
    pub record: warehouse_stock::Model,
    pub breakdown: ConditionBreakdown,
}

impl TryFrom<warehouse_stock::Model> for StockRecordView {
    type Error = ServiceError;

    fn try_from(record: warehouse_stock::Model) -> Result<Self, Self::Error> {
        let breakdown = ConditionBreakdown::from_json(&record.condition_breakdown)?;
        Ok(Self { record, breakdown })
    }
}

/// Warehouse stock ledger and custody (zimmet) assignments
#[derive(Clone)]
pub struct StockService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl StockService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn create_stock_record(
        &self,
        command: CreateStockRecordCommand,
    ) -> Result<StockRecordView, ServiceError> {
        let record = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        StockRecordView::try_from(record)
    }

    #[instrument(skip(self))]
    pub async fn get_stock_record(&self, stock_record_id: Uuid) -> Result<StockRecordView, ServiceError> {
        let record = load_stock_record(self.db_pool.as_ref(), stock_record_id).await?;
        StockRecordView::try_from(record)
    }

    /// All stock records of a material item, oldest first
    #[instrument(skip(self))]
    pub async fn list_by_material(
        &self,
        material_item_id: Uuid,
    ) -> Result<Vec<StockRecordView>, ServiceError> {
        let db = self.db_pool.as_ref();
        let material_exists = material_item::Entity::find_by_id(material_item_id)
            .count(db)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch material item {}: {}", material_item_id, e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?
            > 0;
        if !material_exists {
            return Err(ServiceError::NotFound(format!(
                "Malzeme bulunamadı: {}",
                material_item_id
            )));
        }

        warehouse_stock::Entity::find()
            .filter(warehouse_stock::Column::MaterialItemId.eq(material_item_id))
            .order_by_asc(warehouse_stock::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                let msg = format!(
                    "Failed to fetch stock records of material {}: {}",
                    material_item_id, e
                );
                error!("{}", msg);
                ServiceError::db_error(e)
            })?
            .into_iter()
            .map(StockRecordView::try_from)
            .collect()
    }

    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, command: AdjustStockCommand) -> Result<StockRecordView, ServiceError> {
        let record = command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await?;
        StockRecordView::try_from(record)
    }

    #[instrument(skip(self))]
    pub async fn checkout_custody(
        &self,
        command: CheckoutCustodyCommand,
    ) -> Result<custody_assignment::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn return_custody(
        &self,
        command: ReturnCustodyCommand,
    ) -> Result<custody_assignment::Model, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Custody assignments drawn from one stock record, newest first
    #[instrument(skip(self))]
    pub async fn list_custody(
        &self,
        stock_record_id: Uuid,
    ) -> Result<Vec<custody_assignment::Model>, ServiceError> {
        let db = self.db_pool.as_ref();
        load_stock_record(db, stock_record_id).await?;

        custody_assignment::Entity::find()
            .filter(custody_assignment::Column::StockRecordId.eq(stock_record_id))
            .order_by_desc(custody_assignment::Column::AssignedAt)
            .all(db)
            .await
            .map_err(|e| {
                let msg = format!(
                    "Failed to fetch custody assignments of stock record {}: {}",
                    stock_record_id, e
                );
                error!("{}", msg);
                ServiceError::db_error(e)
            })
    }
}
