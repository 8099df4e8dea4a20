use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle of a supplier order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "partially_delivered")]
    PartiallyDelivered,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "returned")]
    Returned,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Whether the user asked for a replacement when returning goods.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum ReorderDecision {
    #[sea_orm(string_value = "unanswered")]
    Unanswered,
    #[sea_orm(string_value = "yes")]
    Yes,
    #[sea_orm(string_value = "no")]
    No,
}

impl From<Option<bool>> for ReorderDecision {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => ReorderDecision::Yes,
            Some(false) => ReorderDecision::No,
            None => ReorderDecision::Unanswered,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: String,
    pub purchase_request_id: Uuid,
    pub material_item_id: Uuid,
    pub supplier_id: Option<Uuid>,
    /// Ordered quantity
    pub quantity: i32,
    /// Cumulative quantity returned to the supplier
    pub returned_quantity: i32,
    pub reorder_decision: ReorderDecision,
    pub status: OrderStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub return_notes: Option<String>,
    /// Optimistic concurrency token, bumped on every write
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_request::Entity",
        from = "Column::PurchaseRequestId",
        to = "super::purchase_request::Column::Id"
    )]
    PurchaseRequest,
    #[sea_orm(
        belongs_to = "super::material_item::Entity",
        from = "Column::MaterialItemId",
        to = "super::material_item::Column::Id"
    )]
    MaterialItem,
    #[sea_orm(has_many = "super::order_delivery::Entity")]
    Deliveries,
}

impl Related<super::purchase_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseRequest.def()
    }
}

impl Related<super::material_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaterialItem.def()
    }
}

impl Related<super::order_delivery::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deliveries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Units that can still be returned given what has already been delivered.
    pub fn max_returnable(&self, delivered_quantity: i32) -> i32 {
        (self.quantity - delivered_quantity - self.returned_quantity).max(0)
    }
}
