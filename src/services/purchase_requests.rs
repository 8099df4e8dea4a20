use crate::{
    db::DbPool,
    entities::{purchase_request, purchase_request_item},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

/// A purchase request with its line items.
#[derive(Debug, Clone)]
pub struct PurchaseRequestView {
    pub request: purchase_request::Model,
    pub items: Vec<purchase_request_item::Model>,
}

/// Read access to purchase requests
#[derive(Clone)]
pub struct PurchaseRequestService {
    db_pool: Arc<DbPool>,
}

impl PurchaseRequestService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn get_request(&self, request_id: Uuid) -> Result<PurchaseRequestView, ServiceError> {
        let db = self.db_pool.as_ref();
        let request = purchase_request::Entity::find_by_id(request_id)
            .one(db)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch purchase request {}: {}", request_id, e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Satın alma talebi bulunamadı: {}", request_id))
            })?;

        let items = purchase_request_item::Entity::find()
            .filter(purchase_request_item::Column::PurchaseRequestId.eq(request_id))
            .order_by_asc(purchase_request_item::Column::CreatedAt)
            .all(db)
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch items of purchase request {}: {}", request_id, e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?;

        Ok(PurchaseRequestView { request, items })
    }

    /// Replacement requests raised from returns against `original_request_id`,
    /// newest first.
    #[instrument(skip(self))]
    pub async fn list_reorders(
        &self,
        original_request_id: Uuid,
    ) -> Result<Vec<PurchaseRequestView>, ServiceError> {
        let db = self.db_pool.as_ref();
        // 404 when the original itself does not exist
        self.get_request(original_request_id).await?;

        let requests = purchase_request::Entity::find()
            .filter(purchase_request::Column::OriginalRequestId.eq(original_request_id))
            .order_by_desc(purchase_request::Column::CreatedAt)
            .find_with_related(purchase_request_item::Entity)
            .all(db)
            .await
            .map_err(|e| {
                let msg = format!(
                    "Failed to fetch reorder requests of {}: {}",
                    original_request_id, e
                );
                error!("{}", msg);
                ServiceError::db_error(e)
            })?;

        Ok(requests
            .into_iter()
            .map(|(request, items)| PurchaseRequestView { request, items })
            .collect())
    }
}
