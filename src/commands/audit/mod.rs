pub mod record_audit_entry_command;

pub use record_audit_entry_command::RecordAuditEntryCommand;

/// Action types written to the audit log.
pub mod actions {
    pub const ORDER_RETURNED: &str = "order_returned";
    pub const ORDER_DELIVERED: &str = "order_delivered";
    pub const REORDER_REQUEST_CREATED: &str = "reorder_request_created";
    pub const STOCK_RECORD_CREATED: &str = "stock_record_created";
    pub const STOCK_ADJUSTED: &str = "stock_adjusted";
    pub const CUSTODY_CHECKED_OUT: &str = "custody_checked_out";
    pub const CUSTODY_RETURNED: &str = "custody_returned";
}
