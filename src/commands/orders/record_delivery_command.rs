use crate::{
    commands::{
        audit::{actions, RecordAuditEntryCommand},
        flatten_transaction_error,
        orders::{delivered_quantity, load_order, status_after_delivery},
        validate_not_blank, Command,
    },
    db::DbPool,
    entities::{order, order_delivery, OrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Records goods received against an order and moves its status along.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordDeliveryCommand {
    pub order_id: Uuid,
    #[validate(range(min = 1, message = "Teslim miktarı 0'dan büyük olmalıdır"))]
    pub quantity: i32,
    #[validate(custom = "validate_not_blank")]
    pub received_by: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryRecorded {
    pub delivery: order_delivery::Model,
    pub order: order::Model,
    pub delivered_quantity: i32,
}

#[async_trait::async_trait]
impl Command for RecordDeliveryCommand {
    type Result = DeliveryRecorded;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let command = self.clone();
        let recorded = db_pool
            .transaction::<_, DeliveryRecorded, ServiceError>(move |txn| {
                Box::pin(async move { command.record(txn).await })
            })
            .await
            .map_err(flatten_transaction_error)?;

        info!(
            delivery_id = %recorded.delivery.id,
            quantity = self.quantity,
            delivered_total = recorded.delivered_quantity,
            status = ?recorded.order.status,
            "Delivery recorded"
        );

        event_sender
            .send_or_log(Event::OrderDelivered {
                order_id: self.order_id,
                delivery_id: recorded.delivery.id,
                quantity: self.quantity,
            })
            .await;

        Ok(recorded)
    }
}

impl RecordDeliveryCommand {
    async fn record(&self, txn: &DatabaseTransaction) -> Result<DeliveryRecorded, ServiceError> {
        let current = load_order(txn, self.order_id).await?;
        if current.status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "İptal edilmiş siparişe teslimat kaydedilemez".to_string(),
            ));
        }

        let delivered = delivered_quantity(txn, self.order_id).await?;
        let remaining = current.quantity - delivered - current.returned_quantity;
        if self.quantity > remaining {
            return Err(ServiceError::ValidationError(format!(
                "Teslim miktarı kalan miktarı aşıyor (kalan: {})",
                remaining.max(0)
            )));
        }

        let now = Utc::now();
        let delivery = order_delivery::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(self.order_id),
            quantity: Set(self.quantity),
            received_by: Set(self.received_by.trim().to_string()),
            delivered_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| {
            let msg = format!("Failed to insert delivery: {}", e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?;

        let new_delivered = delivered + self.quantity;
        let new_status =
            status_after_delivery(current.quantity, new_delivered, current.returned_quantity);

        let changes = order::ActiveModel {
            status: Set(new_status),
            version: Set(current.version + 1),
            updated_at: Set(now),
            ..Default::default()
        };
        let result = order::Entity::update_many()
            .set(changes)
            .filter(order::Column::Id.eq(self.order_id))
            .filter(order::Column::Version.eq(current.version))
            .exec(txn)
            .await
            .map_err(|e| {
                let msg = format!("Failed to update order status: {}", e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?;
        if result.rows_affected == 0 {
            return Err(ServiceError::ConcurrentModification(self.order_id));
        }

        RecordAuditEntryCommand {
            purchase_request_id: Some(current.purchase_request_id),
            action_type: actions::ORDER_DELIVERED.to_string(),
            performed_by: delivery.received_by.clone(),
            description: format!(
                "{} numaralı siparişe {} birim teslimat kaydedildi",
                current.order_number, self.quantity
            ),
            metadata: json!({
                "order_id": self.order_id,
                "delivery_id": delivery.id,
                "quantity": self.quantity,
                "delivered_total": new_delivered,
                "status": new_status,
            }),
        }
        .insert(txn)
        .await?;

        let order = order::Model {
            status: new_status,
            version: current.version + 1,
            updated_at: now,
            ..current
        };

        Ok(DeliveryRecorded {
            delivery,
            order,
            delivered_quantity: new_delivered,
        })
    }
}
