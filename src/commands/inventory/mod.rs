pub mod adjust_stock_command;
pub mod checkout_custody_command;
pub mod create_stock_record_command;
pub mod return_custody_command;

pub use adjust_stock_command::AdjustStockCommand;
pub use checkout_custody_command::CheckoutCustodyCommand;
pub use create_stock_record_command::CreateStockRecordCommand;
pub use return_custody_command::ReturnCustodyCommand;

use crate::{entities::warehouse_stock, errors::ServiceError, models::ConditionBreakdown};
use chrono::Utc;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::error;
use uuid::Uuid;

pub(crate) async fn load_stock_record<C: ConnectionTrait>(
    conn: &C,
    stock_record_id: Uuid,
) -> Result<warehouse_stock::Model, ServiceError> {
    warehouse_stock::Entity::find_by_id(stock_record_id)
        .one(conn)
        .await
        .map_err(|e| {
            let msg = format!("Failed to fetch stock record {}: {}", stock_record_id, e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("Stok kaydı bulunamadı: {}", stock_record_id))
        })
}

/// Writes a new breakdown and its total back to `record`, guarded by the
/// record's version.
pub(crate) async fn store_breakdown<C: ConnectionTrait>(
    conn: &C,
    record: warehouse_stock::Model,
    breakdown: &ConditionBreakdown,
) -> Result<warehouse_stock::Model, ServiceError> {
    let now = Utc::now();
    let quantity = breakdown.total();
    let breakdown_json = breakdown.to_json();

    let changes = warehouse_stock::ActiveModel {
        quantity: Set(quantity),
        condition_breakdown: Set(breakdown_json.clone()),
        version: Set(record.version + 1),
        updated_at: Set(now),
        ..Default::default()
    };

    let result = warehouse_stock::Entity::update_many()
        .set(changes)
        .filter(warehouse_stock::Column::Id.eq(record.id))
        .filter(warehouse_stock::Column::Version.eq(record.version))
        .exec(conn)
        .await
        .map_err(|e| {
            let msg = format!("Failed to update stock record {}: {}", record.id, e);
            error!("{}", msg);
            ServiceError::db_error(e)
        })?;

    if result.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(record.id));
    }

    Ok(warehouse_stock::Model {
        quantity,
        condition_breakdown: breakdown_json,
        version: record.version + 1,
        updated_at: now,
        ..record
    })
}
