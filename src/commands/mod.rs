use crate::{db::DbPool, errors::ServiceError, events::EventSender};
use async_trait::async_trait;
use std::sync::Arc;

/// Command trait for implementing the Command Pattern
///
/// This trait allows for encapsulating all the logic needed to execute a business operation
/// into a single object that can be validated, executed, and produce events.
#[async_trait]
pub trait Command: Send + Sync {
    /// The return type of the command when executed successfully
    type Result;

    /// Execute the command with the given dependencies
    ///
    /// # Arguments
    /// * `db_pool` - Database connection pool for persistence operations
    /// * `event_sender` - Channel to publish domain events
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

/// Unwraps the error of a `TransactionTrait::transaction` call.
pub(crate) fn flatten_transaction_error(
    err: sea_orm::TransactionError<ServiceError>,
) -> ServiceError {
    match err {
        sea_orm::TransactionError::Connection(db_err) => ServiceError::DatabaseError(db_err),
        sea_orm::TransactionError::Transaction(service_err) => service_err,
    }
}

pub mod audit;
pub mod inventory;
pub mod orders;
pub mod purchaserequests;

/// Rejects empty or whitespace-only strings.
pub(crate) fn validate_not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        let mut err = validator::ValidationError::new("blank");
        err.message = Some("Bu alan boş bırakılamaz".into());
        return Err(err);
    }
    Ok(())
}
