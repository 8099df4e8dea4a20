use crate::{
    commands::{
        audit::{actions, RecordAuditEntryCommand},
        flatten_transaction_error,
        inventory::{load_stock_record, store_breakdown},
        validate_not_blank, Command,
    },
    db::DbPool,
    entities::warehouse_stock,
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ConditionBreakdown, StockCondition},
};
use sea_orm::{DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Moves one condition of a stock record up or down by `delta`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AdjustStockCommand {
    pub stock_record_id: Uuid,
    pub condition: StockCondition,
    #[validate(custom = "validate_non_zero")]
    pub delta: i32,
    #[validate(custom = "validate_not_blank")]
    pub reason: String,
    #[validate(custom = "validate_not_blank")]
    pub performed_by: String,
}

fn validate_non_zero(delta: i32) -> Result<(), ValidationError> {
    if delta == 0 {
        let mut err = ValidationError::new("zero_delta");
        err.message = Some("Düzeltme miktarı 0 olamaz".into());
        return Err(err);
    }
    Ok(())
}

#[async_trait::async_trait]
impl Command for AdjustStockCommand {
    type Result = warehouse_stock::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(stock_record_id = %self.stock_record_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let command = self.clone();
        let record = db_pool
            .transaction::<_, warehouse_stock::Model, ServiceError>(move |txn| {
                Box::pin(async move { command.adjust(txn).await })
            })
            .await
            .map_err(flatten_transaction_error)?;

        info!(
            condition = %self.condition,
            delta = self.delta,
            new_quantity = record.quantity,
            "Stock adjusted"
        );

        event_sender
            .send_or_log(Event::StockAdjusted {
                stock_record_id: record.id,
                condition: self.condition.to_string(),
                delta: self.delta,
                new_quantity: record.quantity,
            })
            .await;

        Ok(record)
    }
}

impl AdjustStockCommand {
    async fn adjust(&self, txn: &DatabaseTransaction) -> Result<warehouse_stock::Model, ServiceError> {
        let record = load_stock_record(txn, self.stock_record_id).await?;
        let mut breakdown = ConditionBreakdown::from_json(&record.condition_breakdown)?;
        let previous_quantity = record.quantity;
        breakdown.apply(self.condition, self.delta)?;

        let updated = store_breakdown(txn, record, &breakdown).await?;

        RecordAuditEntryCommand {
            purchase_request_id: None,
            action_type: actions::STOCK_ADJUSTED.to_string(),
            performed_by: self.performed_by.clone(),
            description: format!(
                "Stok düzeltmesi ({}): {:+} birim, gerekçe: {}",
                self.condition,
                self.delta,
                self.reason.trim()
            ),
            metadata: json!({
                "stock_record_id": updated.id,
                "condition": self.condition,
                "delta": self.delta,
                "previous_quantity": previous_quantity,
                "new_quantity": updated.quantity,
            }),
        }
        .insert(txn)
        .await?;

        Ok(updated)
    }
}
