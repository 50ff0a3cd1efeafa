use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};

/// The closed set of ledger mutations recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionType {
    Create,
    Update,
    Delete,
    ImportStock,
    Reserve,
    Release,
    Sale,
    Return,
    Adjustment,
    Export,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Create => "CREATE",
            TransactionType::Update => "UPDATE",
            TransactionType::Delete => "DELETE",
            TransactionType::ImportStock => "IMPORT_STOCK",
            TransactionType::Reserve => "RESERVE",
            TransactionType::Release => "RELEASE",
            TransactionType::Sale => "SALE",
            TransactionType::Return => "RETURN",
            TransactionType::Adjustment => "ADJUSTMENT",
            TransactionType::Export => "EXPORT",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(TransactionType::Create),
            "UPDATE" => Some(TransactionType::Update),
            "DELETE" => Some(TransactionType::Delete),
            "IMPORT_STOCK" => Some(TransactionType::ImportStock),
            "RESERVE" => Some(TransactionType::Reserve),
            "RELEASE" => Some(TransactionType::Release),
            "SALE" => Some(TransactionType::Sale),
            "RETURN" => Some(TransactionType::Return),
            "ADJUSTMENT" => Some(TransactionType::Adjustment),
            "EXPORT" => Some(TransactionType::Export),
            _ => None,
        }
    }
}

/// Append-only audit record of one ledger mutation. Never updated or deleted;
/// the sole trail for reconstructing ledger state history.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub inventory_item_id: i64,
    pub transaction_type: String,
    pub quantity: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub reference: Option<String>,
    pub user_id: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn transaction_type(&self) -> Option<TransactionType> {
        TransactionType::from_str(&self.transaction_type)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inventory_item::Entity",
        from = "Column::InventoryItemId",
        to = "super::inventory_item::Column::Id"
    )]
    InventoryItem,
}

impl Related<super::inventory_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::InventoryItem.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, _insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;
        if let ActiveValue::NotSet = active_model.created_at {
            active_model.created_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}
