pub mod stock_condition;

pub use stock_condition::{ConditionBreakdown, StockCondition};
