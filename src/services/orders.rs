use crate::{
    commands::{
        orders::{load_order, DeliveryRecorded, RecordDeliveryCommand},
        Command,
    },
    db::DbPool,
    entities::{material_item, order, order_delivery},
    errors::ServiceError,
    events::EventSender,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

/// An order together with the quantities derived from its deliveries.
#[derive(Debug, Clone)]
pub struct OrderView {
    pub order: order::Model,
    pub material: material_item::Model,
    pub deliveries: Vec<order_delivery::Model>,
    pub delivered_quantity: i32,
    pub max_returnable: i32,
}

/// Service for reading orders and recording deliveries
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Loads an order with its material and delivery history
    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderView, ServiceError> {
        let db = self.db_pool.as_ref();
        let order = load_order(db, order_id).await?;

        let material = material_item::Entity::find_by_id(order.material_item_id)
            .one(db)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch material item: {}", e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Malzeme bulunamadı: {}", order.material_item_id))
            })?;

        let deliveries = order_delivery::Entity::find()
            .filter(order_delivery::Column::OrderId.eq(order_id))
            .order_by_asc(order_delivery::Column::DeliveredAt)
            .all(db)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch deliveries of order {}: {}", order_id, e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?;

        let delivered: i32 = deliveries.iter().map(|d| d.quantity).sum();
        let max_returnable = order.max_returnable(delivered);

        Ok(OrderView {
            order,
            material,
            deliveries,
            delivered_quantity: delivered,
            max_returnable,
        })
    }

    /// Records received goods against an order
    #[instrument(skip(self))]
    pub async fn record_delivery(
        &self,
        command: RecordDeliveryCommand,
    ) -> Result<DeliveryRecorded, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }
}
