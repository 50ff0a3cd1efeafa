use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The derived bucket, recomputed by this one routine after every mutation.
/// It is never tracked as an independently settable field.
pub fn compute_available(total: i32, locked: i32, sold: i32) -> i32 {
    total - locked - sold
}

/// Ledger row: one per product, holding the three stock buckets.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub product_id: i64,
    pub product_name: String,
    pub total_quantity: i32,
    pub locked_quantity: i32,
    pub sold_quantity: i32,
    pub available_quantity: i32,
    pub low_stock_threshold: i32,
    pub reorder_point: i32,
    pub is_available: bool,
    pub is_active: bool,
    pub last_sale_date: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn is_low_stock(&self) -> bool {
        self.available_quantity <= self.low_stock_threshold && self.available_quantity > 0
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.available_quantity == 0
    }

    pub fn needs_reorder(&self) -> bool {
        self.available_quantity <= self.reorder_point
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inventory_transaction::Entity")]
    InventoryTransaction,
}

impl Related<super::inventory_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryTransaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
