use crate::{db::DbPool, entities::audit_log, errors::ServiceError};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use std::sync::Arc;
use tracing::{error, instrument};
use uuid::Uuid;

/// Read access to the audit log
#[derive(Clone)]
pub struct AuditService {
    db_pool: Arc<DbPool>,
}

impl AuditService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Entries recorded against a purchase request, newest first.
    /// Returns the requested page and the total entry count.
    #[instrument(skip(self))]
    pub async fn list_for_purchase_request(
        &self,
        purchase_request_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<audit_log::Model>, u64), ServiceError> {
        let paginator = audit_log::Entity::find()
            .filter(audit_log::Column::PurchaseRequestId.eq(purchase_request_id))
            .order_by_desc(audit_log::Column::CreatedAt)
            .paginate(self.db_pool.as_ref(), limit.max(1));

        let total = paginator.num_items().await.map_err(|e| {
            let msg = format!("Failed to count audit entries: {}", e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?;

        let entries = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(|e| {
                let msg = format!("Failed to fetch audit entries: {}", e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?;

        Ok((entries, total))
    }
}
