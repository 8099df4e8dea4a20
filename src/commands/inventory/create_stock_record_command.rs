use crate::{
    commands::{
        audit::{actions, RecordAuditEntryCommand},
        flatten_transaction_error, validate_not_blank, Command,
    },
    db::DbPool,
    entities::{material_item, warehouse_stock},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ConditionBreakdown, StockCondition},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateStockRecordCommand {
    pub material_item_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub condition_breakdown: BTreeMap<StockCondition, i32>,
    #[validate(custom = "validate_not_blank")]
    pub created_by: String,
}

#[async_trait::async_trait]
impl Command for CreateStockRecordCommand {
    type Result = warehouse_stock::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(material_item_id = %self.material_item_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let breakdown = ConditionBreakdown::new(self.condition_breakdown.clone())?;

        let command = self.clone();
        let record = db_pool
            .transaction::<_, warehouse_stock::Model, ServiceError>(move |txn| {
                Box::pin(async move { command.create(txn, breakdown).await })
            })
            .await
            .map_err(flatten_transaction_error)?;

        info!(
            stock_record_id = %record.id,
            quantity = record.quantity,
            "Stock record created"
        );

        event_sender
            .send_or_log(Event::StockRecordCreated(record.id))
            .await;

        Ok(record)
    }
}

impl CreateStockRecordCommand {
    async fn create(
        &self,
        txn: &DatabaseTransaction,
        breakdown: ConditionBreakdown,
    ) -> Result<warehouse_stock::Model, ServiceError> {
        let material = material_item::Entity::find_by_id(self.material_item_id)
            .one(txn)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch material item: {}", e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Malzeme bulunamadı: {}", self.material_item_id))
            })?;

        let now = Utc::now();
        let record = warehouse_stock::ActiveModel {
            id: Set(Uuid::new_v4()),
            material_item_id: Set(material.id),
            warehouse_id: Set(self.warehouse_id),
            quantity: Set(breakdown.total()),
            condition_breakdown: Set(breakdown.to_json()),
            version: Set(1),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| {
            let msg = format!("Failed to insert stock record: {}", e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?;

        RecordAuditEntryCommand {
            purchase_request_id: None,
            action_type: actions::STOCK_RECORD_CREATED.to_string(),
            performed_by: self.created_by.clone(),
            description: format!(
                "{} için {} {} stok kaydı açıldı",
                material.name, record.quantity, material.unit
            ),
            metadata: json!({
                "stock_record_id": record.id,
                "material_item_id": material.id,
                "condition_breakdown": record.condition_breakdown,
            }),
        }
        .insert(txn)
        .await?;

        Ok(record)
    }
}
