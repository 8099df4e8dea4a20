use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Warehouse stock of one material. `quantity` always mirrors the sum of
/// `condition_breakdown`, see `models::ConditionBreakdown`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "warehouse_stock")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub material_item_id: Uuid,
    pub warehouse_id: Option<Uuid>,
    pub quantity: i32,
    pub condition_breakdown: Json,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::material_item::Entity",
        from = "Column::MaterialItemId",
        to = "super::material_item::Column::Id"
    )]
    MaterialItem,
    #[sea_orm(has_many = "super::custody_assignment::Entity")]
    CustodyAssignments,
}

impl Related<super::material_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MaterialItem.def()
    }
}

impl Related<super::custody_assignment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CustodyAssignments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
