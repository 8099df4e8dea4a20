use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Status given to purchase requests raised automatically by a return.
pub const REORDER_REQUEST_STATUS: &str = "iade nedeniyle sipariş";

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "purchase_requests")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub request_number: String,
    pub title: String,
    pub department: Option<String>,
    pub currency: String,
    pub urgency: Option<String>,
    pub site: Option<String>,
    pub status: String,
    pub requested_by: String,
    /// Request this one was raised to replace, for automatic reorders
    pub original_request_id: Option<Uuid>,
    /// Order whose return triggered this request
    pub return_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::purchase_request_item::Entity")]
    PurchaseRequestItems,
    #[sea_orm(has_many = "super::material_item::Entity")]
    MaterialItems,
    #[sea_orm(has_many = "super::order::Entity")]
    Orders,
}

impl Related<super::purchase_request_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseRequestItems.def()
    }
}

impl Related<super::material_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaterialItems.def()
    }
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Orders.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// True when the request was raised automatically from a returned order.
    pub fn is_reorder(&self) -> bool {
        self.original_request_id.is_some() && self.return_order_id.is_some()
    }
}
