use crate::{
    commands::{validate_not_blank, Command},
    db::DbPool,
    entities::order,
    errors::ServiceError,
    events::EventSender,
};
use chrono::Utc;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SaveReturnNotesCommand {
    pub order_id: Uuid,
    #[validate(custom = "validate_not_blank")]
    pub notes: String,
}

#[async_trait::async_trait]
impl Command for SaveReturnNotesCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, _event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        _event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let changes = order::ActiveModel {
            return_notes: Set(Some(self.notes.trim().to_string())),
            updated_at: Set(Utc::now()),
            ..Default::default()
        };

        let result = order::Entity::update_many()
            .set(changes)
            .filter(order::Column::Id.eq(self.order_id))
            .exec(db_pool.as_ref())
            .await
            .map_err(|e| {
                let msg = format!("Failed to save return notes: {}", e);
                error!("{}", msg);
                ServiceError::db_error(e)
            })?;

        if result.rows_affected == 0 {
            return Err(ServiceError::NotFound(format!(
                "Sipariş bulunamadı: {}",
                self.order_id
            )));
        }

        info!("Return notes saved");
        Ok(())
    }
}
