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
use sea_orm::{
    ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Closes an active custody assignment and puts its units back on the
/// ledger under the condition they came back in (`used` unless stated).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReturnCustodyCommand {
    pub assignment_id: Uuid,
    pub return_condition: Option<StockCondition>,
    pub notes: Option<String>,
    #[validate(custom = "validate_not_blank")]
    pub returned_by: String,
}

#[async_trait::async_trait]
impl Command for ReturnCustodyCommand {
    type Result = custody_assignment::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(assignment_id = %self.assignment_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let command = self.clone();
        let assignment = db_pool
            .transaction::<_, custody_assignment::Model, ServiceError>(move |txn| {
                Box::pin(async move { command.close(txn).await })
            })
            .await
            .map_err(flatten_transaction_error)?;

        info!(
            quantity = assignment.quantity,
            return_condition = ?assignment.return_condition,
            "Custody returned"
        );

        event_sender
            .send_or_log(Event::CustodyReturned {
                assignment_id: assignment.id,
                stock_record_id: assignment.stock_record_id,
                quantity: assignment.quantity,
            })
            .await;

        Ok(assignment)
    }
}

impl ReturnCustodyCommand {
    async fn close(
        &self,
        txn: &DatabaseTransaction,
    ) -> Result<custody_assignment::Model, ServiceError> {
        let assignment = custody_assignment::Entity::find_by_id(self.assignment_id)
            .one(txn)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch custody assignment: {}", e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Zimmet kaydı bulunamadı: {}", self.assignment_id))
            })?;

        if assignment.status != CustodyStatus::Active {
            return Err(ServiceError::InvalidOperation(
                "Zimmet zaten iade edilmiş".to_string(),
            ));
        }

        let condition = self.return_condition.unwrap_or(StockCondition::Used);
        let record = load_stock_record(txn, assignment.stock_record_id).await?;
        let mut breakdown = ConditionBreakdown::from_json(&record.condition_breakdown)?;
        breakdown.apply(condition, assignment.quantity)?;
        let updated = store_breakdown(txn, record, &breakdown).await?;

        let now = Utc::now();
        let notes = match (assignment.notes.clone(), self.notes.clone()) {
            (Some(prev), Some(new)) if !new.trim().is_empty() => Some(format!("{}\n{}", prev, new)),
            (None, Some(new)) if !new.trim().is_empty() => Some(new),
            (prev, _) => prev,
        };

        let changes = custody_assignment::ActiveModel {
            status: Set(CustodyStatus::Returned),
            return_condition: Set(Some(condition.to_string())),
            notes: Set(notes.clone()),
            returned_at: Set(Some(now)),
            ..Default::default()
        };
        let result = custody_assignment::Entity::update_many()
            .set(changes)
            .filter(custody_assignment::Column::Id.eq(assignment.id))
            .filter(custody_assignment::Column::Status.eq(CustodyStatus::Active))
            .exec(txn)
            .await
            .map_err(|e| {
                let msg = format!("Failed to close custody assignment: {}", e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(assignment.id));
        }

        RecordAuditEntryCommand {
            purchase_request_id: None,
            action_type: actions::CUSTODY_RETURNED.to_string(),
            performed_by: self.returned_by.clone(),
            description: format!(
                "{} kişisindeki {} birim zimmet iade alındı ({})",
                assignment.assigned_to, assignment.quantity, condition
            ),
            metadata: json!({
                "assignment_id": assignment.id,
                "stock_record_id": updated.id,
                "quantity": assignment.quantity,
                "return_condition": condition,
                "new_quantity": updated.quantity,
            }),
        }
        .insert(txn)
        .await?;

        Ok(custody_assignment::Model {
            status: CustodyStatus::Returned,
            return_condition: Some(condition.to_string()),
            notes,
            returned_at: Some(now),
            ..assignment
        })
    }
}
