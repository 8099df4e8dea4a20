pub mod audit_log;
pub mod custody_assignment;
pub mod material_item;
pub mod order;
pub mod order_delivery;
pub mod purchase_request;
pub mod purchase_request_item;
pub mod warehouse_stock;

pub use custody_assignment::CustodyStatus;
pub use order::{OrderStatus, ReorderDecision};
