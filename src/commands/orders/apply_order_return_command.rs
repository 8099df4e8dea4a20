use crate::{
    commands::{orders::load_order, Command},
    db::DbPool,
    entities::{order, OrderStatus, ReorderDecision},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

/// Adds a returned quantity to an order, guarded by the version the caller
/// validated against. Nothing is written when another writer got there first.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ApplyOrderReturnCommand {
    pub order_id: Uuid,
    pub expected_version: i32,
    #[validate(range(min = 1, message = "İade miktarı 0'dan büyük olmalıdır"))]
    pub return_quantity: i32,
    /// Delivered total observed while validating the return
    pub delivered_quantity: i32,
    pub reorder_decision: ReorderDecision,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReturnApplied {
    pub order: order::Model,
    pub fully_returned: bool,
}

#[async_trait::async_trait]
impl Command for ApplyOrderReturnCommand {
    type Result = OrderReturnApplied;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;
        let db = db_pool.as_ref();

        let current = load_order(db, self.order_id).await?;
        if current.version != self.expected_version {
            warn!(
                expected = self.expected_version,
                found = current.version,
                "Order changed since the return was validated"
            );
            return Err(ServiceError::ConcurrentModification(self.order_id));
        }

        let max_returnable = current.max_returnable(self.delivered_quantity);
        if self.return_quantity > max_returnable {
            return Err(ServiceError::ValidationError(format!(
                "İade miktarı en fazla {} olabilir",
                max_returnable
            )));
        }

        let new_returned = current.returned_quantity + self.return_quantity;
        let fully_returned = new_returned + self.delivered_quantity >= current.quantity;
        let new_status = if fully_returned {
            OrderStatus::Returned
        } else {
            current.status
        };
        let now = Utc::now();

        let changes = order::ActiveModel {
            returned_quantity: Set(new_returned),
            reorder_decision: Set(self.reorder_decision),
            status: Set(new_status),
            version: Set(current.version + 1),
            updated_at: Set(now),
            ..Default::default()
        };

        let result = order::Entity::update_many()
            .set(changes)
            .filter(order::Column::Id.eq(self.order_id))
            .filter(order::Column::Version.eq(self.expected_version))
            .exec(db)
            .await
            .map_err(|e| {
                let msg = format!("Failed to apply return to order {}: {}", self.order_id, e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?;

        if result.rows_affected == 0 {
            warn!("Order version moved during return update");
            return Err(ServiceError::ConcurrentModification(self.order_id));
        }

        let updated = order::Model {
            returned_quantity: new_returned,
            reorder_decision: self.reorder_decision,
            status: new_status,
            version: current.version + 1,
            updated_at: now,
            ..current
        };

        info!(
            return_quantity = self.return_quantity,
            total_returned = new_returned,
            fully_returned,
            "Order return applied"
        );

        event_sender
            .send_or_log(Event::OrderReturned {
                order_id: self.order_id,
                quantity: self.return_quantity,
                total_returned: new_returned,
                fully_returned,
            })
            .await;

        Ok(OrderReturnApplied {
            order: updated,
            fully_returned,
        })
    }
}
