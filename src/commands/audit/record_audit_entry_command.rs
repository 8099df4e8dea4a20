use crate::{
    commands::{validate_not_blank, Command},
    db::DbPool,
    entities::audit_log,
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Appends one immutable entry to the audit log.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RecordAuditEntryCommand {
    pub purchase_request_id: Option<Uuid>,
    #[validate(custom = "validate_not_blank")]
    pub action_type: String,
    #[validate(custom = "validate_not_blank")]
    pub performed_by: String,
    #[validate(custom = "validate_not_blank")]
    pub description: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[async_trait::async_trait]
impl Command for RecordAuditEntryCommand {
    type Result = audit_log::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(action_type = %self.action_type))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let entry = self.insert(db_pool.as_ref()).await?;

        event_sender
            .send_or_log(Event::AuditEntryRecorded(entry.id))
            .await;

        Ok(entry)
    }
}

impl RecordAuditEntryCommand {
    /// Validates and inserts the entry on `conn`, which may be an open
    /// transaction so the entry commits together with the audited change.
    pub async fn insert<C: ConnectionTrait>(
        &self,
        conn: &C,
    ) -> Result<audit_log::Model, ServiceError> {
        self.validate()?;

        let metadata = if self.metadata.is_null() {
            serde_json::json!({})
        } else {
            self.metadata.clone()
        };

        let entry = audit_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            purchase_request_id: Set(self.purchase_request_id),
            action_type: Set(self.action_type.clone()),
            performed_by: Set(self.performed_by.clone()),
            description: Set(self.description.clone()),
            metadata: Set(metadata),
            created_at: Set(Utc::now()),
        };

        let entry = entry.insert(conn).await.map_err(|e| {
            let msg = format!("Failed to insert audit entry: {}", e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?;

        info!(
            audit_id = %entry.id,
            action_type = %entry.action_type,
            performed_by = %entry.performed_by,
            "Audit entry recorded"
        );

        Ok(entry)
    }
}
