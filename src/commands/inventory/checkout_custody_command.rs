use crate::{
    commands::{
        audit::{actions, RecordAuditEntryCommand},
        flatten_transaction_error,
        inventory::{load_stock_record, store_breakdown},
        validate_not_blank, Command,
    },
    db::DbPool,
    entities::{custody_assignment, CustodyStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    models::{ConditionBreakdown, StockCondition},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Hands `quantity` units of one condition over to a person (zimmet).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CheckoutCustodyCommand {
    pub stock_record_id: Uuid,
    #[validate(custom = "validate_not_blank")]
    pub assigned_to: String,
    #[validate(range(min = 1, message = "Zimmet miktarı 0'dan büyük olmalıdır"))]
    pub quantity: i32,
    pub condition: StockCondition,
    pub notes: Option<String>,
    #[validate(custom = "validate_not_blank")]
    pub assigned_by: String,
}

#[async_trait::async_trait]
impl Command for CheckoutCustodyCommand {
    type Result = custody_assignment::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(stock_record_id = %self.stock_record_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let command = self.clone();
        let assignment = db_pool
            .transaction::<_, custody_assignment::Model, ServiceError>(move |txn| {
                Box::pin(async move { command.checkout(txn).await })
            })
            .await
            .map_err(flatten_transaction_error)?;

        info!(
            assignment_id = %assignment.id,
            assigned_to = %assignment.assigned_to,
            quantity = assignment.quantity,
            "Custody checked out"
        );

        event_sender
            .send_or_log(Event::CustodyCheckedOut {
                assignment_id: assignment.id,
                stock_record_id: self.stock_record_id,
                quantity: assignment.quantity,
            })
            .await;

        Ok(assignment)
    }
}

impl CheckoutCustodyCommand {
    async fn checkout(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<custody_assignment::Model, ServiceError> {
        let record = load_stock_record(txn, self.stock_record_id).await?;
        let mut breakdown = ConditionBreakdown::from_json(&record.condition_breakdown)?;
        breakdown.apply(self.condition, -self.quantity)?;
        let updated = store_breakdown(txn, record, &breakdown).await?;

        let assignment = custody_assignment::ActiveModel {
            id: Set(Uuid::new_v4()),
            stock_record_id: Set(updated.id),
            assigned_to: Set(self.assigned_to.trim().to_string()),
            quantity: Set(self.quantity),
            checkout_condition: Set(self.condition.to_string()),
            status: Set(CustodyStatus::Active),
            return_condition: Set(None),
            notes: Set(self.notes.clone().filter(|n| !n.trim().is_empty())),
            assigned_by: Set(self.assigned_by.clone()),
            assigned_at: Set(Utc::now()),
            returned_at: Set(None),
        }
        .insert(txn)
        .await
        .map_err(|e| {
            let msg = format!("Failed to insert custody assignment: {}", e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?;

        RecordAuditEntryCommand {
            purchase_request_id: None,
            action_type: actions::CUSTODY_CHECKED_OUT.to_string(),
            performed_by: self.assigned_by.clone(),
            description: format!(
                "{} birim ({}) {} kişisine zimmetlendi",
                self.quantity, self.condition, assignment.assigned_to
            ),
            metadata: json!({
                "assignment_id": assignment.id,
                "stock_record_id": updated.id,
                "quantity": self.quantity,
                "condition": self.condition,
                "remaining_quantity": updated.quantity,
            }),
        }
        .insert(txn)
        .await?;

        Ok(assignment)
    }
}
