use crate::{
    entities::{
        inventory_item::{self, Entity as InventoryItem},
        inventory_transaction::{self, Entity as InventoryTransaction},
    },
    errors::ServiceError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};

/// Read-only questions against the ledger. Queries never mutate and never
/// append audit records.
#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError>;
}

async fn find_item(
    db: &DatabaseConnection,
    product_id: i64,
) -> Result<inventory_item::Model, ServiceError> {
    InventoryItem::find()
        .filter(inventory_item::Column::ProductId.eq(product_id))
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("No ledger row for product {}", product_id)))
}

/// Units a shopper could still order right now.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetAvailableQuantityQuery {
    pub product_id: i64,
}

#[async_trait]
impl Query for GetAvailableQuantityQuery {
    type Result = i32;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        Ok(find_item(db, self.product_id).await?.available_quantity)
    }
}

/// Units confirmed sold and not yet returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetSoldQuantityQuery {
    pub product_id: i64,
}

#[async_trait]
impl Query for GetSoldQuantityQuery {
    type Result = i32;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        Ok(find_item(db, self.product_id).await?.sold_quantity)
    }
}

/// The full ledger row for a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetInventoryItemQuery {
    pub product_id: i64,
}

#[async_trait]
impl Query for GetInventoryItemQuery {
    type Result = inventory_item::Model;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        find_item(db, self.product_id).await
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetActiveItemsQuery;

#[async_trait]
impl Query for GetActiveItemsQuery {
    type Result = Vec<inventory_item::Model>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        InventoryItem::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .order_by_asc(inventory_item::Column::ProductId)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetAvailableItemsQuery;

#[async_trait]
impl Query for GetAvailableItemsQuery {
    type Result = Vec<inventory_item::Model>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        InventoryItem::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .filter(inventory_item::Column::IsAvailable.eq(true))
            .order_by_asc(inventory_item::Column::ProductId)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}

/// Rows at or below their low-stock threshold, excluding rows already
/// out of stock.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetLowStockItemsQuery;

#[async_trait]
impl Query for GetLowStockItemsQuery {
    type Result = Vec<inventory_item::Model>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        InventoryItem::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .filter(inventory_item::Column::AvailableQuantity.gt(0))
            .filter(
                Expr::col(inventory_item::Column::AvailableQuantity)
                    .lte(Expr::col(inventory_item::Column::LowStockThreshold)),
            )
            .order_by_asc(inventory_item::Column::AvailableQuantity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GetItemsNeedingReorderQuery;

#[async_trait]
impl Query for GetItemsNeedingReorderQuery {
    type Result = Vec<inventory_item::Model>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        InventoryItem::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .filter(
                Expr::col(inventory_item::Column::AvailableQuantity)
                    .lte(Expr::col(inventory_item::Column::ReorderPoint)),
            )
            .order_by_asc(inventory_item::Column::AvailableQuantity)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}

/// Audit records tied to one order reference, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionsByReferenceQuery {
    pub reference: String,
}

#[async_trait]
impl Query for GetTransactionsByReferenceQuery {
    type Result = Vec<inventory_transaction::Model>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        InventoryTransaction::find()
            .filter(inventory_transaction::Column::Reference.eq(self.reference.clone()))
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}

/// One page of a product's audit history, newest first. Pages are
/// 1-based.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionsByItemQuery {
    pub product_id: i64,
    pub page: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<inventory_transaction::Model>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[async_trait]
impl Query for GetTransactionsByItemQuery {
    type Result = TransactionPage;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        let item = find_item(db, self.product_id).await?;
        let page = self.page.max(1);
        let limit = self.limit.max(1);

        let paginator = InventoryTransaction::find()
            .filter(inventory_transaction::Column::InventoryItemId.eq(item.id))
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .paginate(db, limit);

        let total = paginator
            .num_items()
            .await
            .map_err(ServiceError::db_error)?;
        let transactions = paginator
            .fetch_page(page - 1)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(TransactionPage {
            transactions,
            total,
            page,
            limit,
        })
    }
}

/// Audit records within a time window, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetTransactionsByDateRangeQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

#[async_trait]
impl Query for GetTransactionsByDateRangeQuery {
    type Result = Vec<inventory_transaction::Model>;

    async fn execute(&self, db: &DatabaseConnection) -> Result<Self::Result, ServiceError> {
        InventoryTransaction::find()
            .filter(inventory_transaction::Column::CreatedAt.gte(self.from))
            .filter(inventory_transaction::Column::CreatedAt.lte(self.to))
            .order_by_desc(inventory_transaction::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)
    }
}
