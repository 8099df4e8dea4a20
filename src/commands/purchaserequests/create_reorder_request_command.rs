use crate::{
    commands::{
        audit::{actions, RecordAuditEntryCommand},
        flatten_transaction_error,
        orders::load_order,
        validate_not_blank, Command,
    },
    db::DbPool,
    entities::{
        material_item, purchase_request, purchase_request::REORDER_REQUEST_STATUS,
        purchase_request_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, EntityTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Raises a replacement purchase request for units returned on an order.
///
/// The request and its single line item are written in one transaction, so a
/// failing line item never leaves an empty request behind.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateReorderRequestCommand {
    pub original_request_id: Uuid,
    pub order_id: Uuid,
    #[validate(range(min = 1, message = "Yeniden sipariş miktarı 0'dan büyük olmalıdır"))]
    pub return_quantity: i32,
    #[validate(custom = "validate_not_blank")]
    pub requested_by: String,
    #[validate(length(min = 1))]
    pub request_number_prefix: String,
    /// Used when the original request carries no currency
    #[validate(length(equal = 3))]
    pub fallback_currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequestCreated {
    pub request: purchase_request::Model,
    pub item: purchase_request_item::Model,
}

/// `<prefix>-<YYYYMMDDHHMMSS>-<4 random digits>`
pub fn generate_request_number(prefix: &str, at: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen_range(0..10_000);
    format!("{}-{}-{:04}", prefix, at.format("%Y%m%d%H%M%S"), suffix)
}

fn reorder_currency(original: &str, fallback: &str) -> String {
    let original = original.trim();
    if original.is_empty() {
        fallback.to_string()
    } else {
        original.to_string()
    }
}

#[async_trait::async_trait]
impl Command for CreateReorderRequestCommand {
    type Result = ReorderRequestCreated;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id, original_request_id = %self.original_request_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let command = self.clone();
        let created = db_pool
            .transaction::<_, ReorderRequestCreated, ServiceError>(move |txn| {
                Box::pin(async move { command.create(txn).await })
            })
            .await
            .map_err(flatten_transaction_error)?;

        info!(
            request_id = %created.request.id,
            request_number = %created.request.request_number,
            quantity = created.item.quantity,
            "Reorder request created"
        );

        event_sender
            .send_or_log(Event::ReorderRequestCreated {
                request_id: created.request.id,
                original_request_id: self.original_request_id,
                order_id: self.order_id,
            })
            .await;

        Ok(created)
    }
}

impl CreateReorderRequestCommand {
    async fn create(&self, txn: &DatabaseTransaction) -> Result<ReorderRequestCreated, ServiceError> {
        let original = purchase_request::Entity::find_by_id(self.original_request_id)
            .one(txn)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch original purchase request: {}", e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Orijinal satın alma talebi bulunamadı: {}",
                    self.original_request_id
                ))
            })?;

        let order = load_order(txn, self.order_id).await?;

        let material = material_item::Entity::find_by_id(order.material_item_id)
            .one(txn)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch material item: {}", e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Malzeme bulunamadı: {}",
                    order.material_item_id
                ))
            })?;

        let now = Utc::now();
        let request = purchase_request::ActiveModel {
            id: Set(Uuid::new_v4()),
            request_number: Set(generate_request_number(&self.request_number_prefix, now)),
            title: Set(format!("{} (iade nedeniyle yeniden sipariş)", original.title)),
            department: Set(original.department.clone()),
            currency: Set(reorder_currency(&original.currency, &self.fallback_currency)),
            urgency: Set(original.urgency.clone()),
            site: Set(original.site.clone()),
            status: Set(REORDER_REQUEST_STATUS.to_string()),
            requested_by: Set(self.requested_by.clone()),
            original_request_id: Set(Some(original.id)),
            return_order_id: Set(Some(order.id)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| {
            let msg = format!("Failed to insert reorder request: {}", e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?;

        let item = purchase_request_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_request_id: Set(request.id),
            material_name: Set(material.name.clone()),
            unit: Set(material.unit.clone()),
            brand: Set(material.brand.clone()),
            specifications: Set(material.specifications.clone()),
            quantity: Set(self.return_quantity),
            created_at: Set(now),
        }
        .insert(txn)
        .await
        .map_err(|e| {
            let msg = format!("Failed to insert reorder line item: {}", e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?;

        RecordAuditEntryCommand {
            purchase_request_id: Some(request.id),
            action_type: actions::REORDER_REQUEST_CREATED.to_string(),
            performed_by: self.requested_by.clone(),
            description: format!(
                "{} numaralı siparişin iadesi için {} talebi oluşturuldu",
                order.order_number, request.request_number
            ),
            metadata: json!({
                "original_request_id": original.id,
                "order_id": order.id,
                "material_name": material.name,
                "quantity": self.return_quantity,
            }),
        }
        .insert(txn)
        .await?;

        Ok(ReorderRequestCreated { request, item })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn request_number_has_prefix_timestamp_and_four_digits() {
        let at = Utc.with_ymd_and_hms(2026, 3, 9, 14, 5, 7).unwrap();
        let number = generate_request_number("PR", at);
        let parts: Vec<&str> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "PR");
        assert_eq!(parts[1], "20260309140507");
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn blank_currency_falls_back() {
        assert_eq!(reorder_currency("EUR", "TRY"), "EUR");
        assert_eq!(reorder_currency("  ", "TRY"), "TRY");
    }
}
