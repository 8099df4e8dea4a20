pub mod apply_order_return_command;
pub mod record_delivery_command;
pub mod save_return_notes_command;

pub use apply_order_return_command::{ApplyOrderReturnCommand, OrderReturnApplied};
pub use record_delivery_command::{DeliveryRecorded, RecordDeliveryCommand};
pub use save_return_notes_command::SaveReturnNotesCommand;

use crate::{
    entities::{order, order_delivery, OrderStatus},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::error;
use uuid::Uuid;

pub(crate) async fn load_order<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(order_id)
        .one(conn)
        .await
        .map_err(|e| {
            let msg = format!("Failed to fetch order {}: {}", order_id, e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?
        .ok_or_else(|| ServiceError::NotFound(format!("Sipariş bulunamadı: {}", order_id)))
}

/// Sum of all delivery records of an order.
pub(crate) async fn delivered_quantity<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<i32, ServiceError> {
    let deliveries = order_delivery::Entity::find()
        .filter(order_delivery::Column::OrderId.eq(order_id))
        .all(conn)
        .await
        .map_err(|e| {
            let msg = format!("Failed to fetch deliveries of order {}: {}", order_id, e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?;
    Ok(deliveries.iter().map(|d| d.quantity).sum())
}

/// Status implied by delivered and returned totals after a delivery.
pub fn status_after_delivery(ordered: i32, delivered: i32, returned: i32) -> OrderStatus {
    if returned > 0 && delivered + returned >= ordered {
        OrderStatus::Returned
    } else if delivered >= ordered {
        OrderStatus::Delivered
    } else if delivered > 0 {
        OrderStatus::PartiallyDelivered
    } else {
        OrderStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_status_follows_totals() {
        assert_eq!(status_after_delivery(100, 0, 0), OrderStatus::Pending);
        assert_eq!(status_after_delivery(100, 60, 0), OrderStatus::PartiallyDelivered);
        assert_eq!(status_after_delivery(100, 100, 0), OrderStatus::Delivered);
        assert_eq!(status_after_delivery(100, 70, 30), OrderStatus::Returned);
        assert_eq!(status_after_delivery(100, 60, 30), OrderStatus::PartiallyDelivered);
    }
}
