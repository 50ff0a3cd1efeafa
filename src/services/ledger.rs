use crate::{
    db::DbPool,
    entities::{
        inventory_item::{self, Entity as InventoryItem},
        inventory_transaction::{self, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set, TransactionError,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Stocking defaults applied to freshly registered products.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 5;
pub const DEFAULT_REORDER_POINT: i32 = 10;

/// Manages the ledger rows themselves: registration, renames, removal
/// and the read-side listings. Stock movement lives in
/// [`crate::services::reservation::ReservationService`].
#[derive(Clone)]
pub struct LedgerService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl LedgerService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Registers a ledger row for a new product with all buckets at zero.
    #[instrument(skip(self))]
    pub async fn create_item(
        &self,
        product_id: i64,
        product_name: &str,
    ) -> Result<inventory_item::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let name = product_name.to_string();
        let item = db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = InventoryItem::find()
                        .filter(inventory_item::Column::ProductId.eq(product_id))
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?;
                    if existing.is_some() {
                        return Err(ServiceError::AlreadyExists(format!(
                            "Ledger row for product {} already exists",
                            product_id
                        )));
                    }

                    let now = Utc::now();
                    let item = inventory_item::ActiveModel {
                        product_id: Set(product_id),
                        product_name: Set(name),
                        total_quantity: Set(0),
                        locked_quantity: Set(0),
                        sold_quantity: Set(0),
                        available_quantity: Set(0),
                        low_stock_threshold: Set(DEFAULT_LOW_STOCK_THRESHOLD),
                        reorder_point: Set(DEFAULT_REORDER_POINT),
                        is_available: Set(true),
                        is_active: Set(true),
                        last_sale_date: Set(None),
                        version: Set(0),
                        created_at: Set(now),
                        updated_at: Set(now),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    append_record(txn, item.id, TransactionType::Create, "Product registered")
                        .await?;
                    Ok(item)
                })
            })
            .await
            .map_err(flatten_txn_error)?;

        info!(product_id, "Registered ledger row");
        self.publish(Event::ItemCreated { product_id }).await?;
        Ok(item)
    }

    /// Updates the cached product name. Prices and catalog flags are not
    /// tracked here.
    #[instrument(skip(self))]
    pub async fn rename_item(
        &self,
        product_id: i64,
        product_name: &str,
    ) -> Result<inventory_item::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        let name = product_name.to_string();
        let item = db
            .transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
                Box::pin(rename_in_txn(txn, product_id, name))
            })
            .await
            .map_err(flatten_txn_error)?;

        info!(product_id, "Renamed ledger row");
        self.publish(Event::ItemRenamed { product_id }).await?;
        Ok(item)
    }

    /// Hard-deletes the ledger row. Transaction history goes with it via
    /// the cascading foreign key.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, product_id: i64) -> Result<(), ServiceError> {
        let db = self.db_pool.as_ref();
        db.transaction::<_, (), ServiceError>(move |txn| {
            Box::pin(async move {
                let item = InventoryItem::find()
                    .filter(inventory_item::Column::ProductId.eq(product_id))
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("No ledger row for product {}", product_id))
                    })?;

                InventoryItem::delete_by_id(item.id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::db_error)?;
                Ok(())
            })
        })
        .await
        .map_err(flatten_txn_error)?;

        info!(product_id, "Removed ledger row");
        self.publish(Event::ItemRemoved { product_id }).await?;
        Ok(())
    }

    /// Fetches a single ledger row by its product id.
    pub async fn get_item(&self, product_id: i64) -> Result<inventory_item::Model, ServiceError> {
        InventoryItem::find()
            .filter(inventory_item::Column::ProductId.eq(product_id))
            .one(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No ledger row for product {}", product_id))
            })
    }

    /// All rows still active in the catalog.
    pub async fn list_active(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        InventoryItem::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .order_by_asc(inventory_item::Column::ProductId)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Rows flagged sellable and still active.
    pub async fn list_available(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        InventoryItem::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .filter(inventory_item::Column::IsAvailable.eq(true))
            .order_by_asc(inventory_item::Column::ProductId)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Rows at or below their low-stock threshold but not yet empty.
    pub async fn list_low_stock(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        InventoryItem::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .filter(inventory_item::Column::AvailableQuantity.gt(0))
            .filter(
                Expr::col(inventory_item::Column::AvailableQuantity)
                    .lte(Expr::col(inventory_item::Column::LowStockThreshold)),
            )
            .order_by_asc(inventory_item::Column::AvailableQuantity)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    /// Rows whose available stock has fallen to the reorder point.
    pub async fn list_needing_reorder(&self) -> Result<Vec<inventory_item::Model>, ServiceError> {
        InventoryItem::find()
            .filter(inventory_item::Column::IsActive.eq(true))
            .filter(
                Expr::col(inventory_item::Column::AvailableQuantity)
                    .lte(Expr::col(inventory_item::Column::ReorderPoint)),
            )
            .order_by_asc(inventory_item::Column::AvailableQuantity)
            .all(self.db_pool.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn publish(&self, event: Event) -> Result<(), ServiceError> {
        self.event_sender
            .send(event)
            .await
            .map_err(ServiceError::EventError)
    }
}

async fn rename_in_txn(
    txn: &sea_orm::DatabaseTransaction,
    product_id: i64,
    product_name: String,
) -> Result<inventory_item::Model, ServiceError> {
    let item = InventoryItem::find()
        .filter(inventory_item::Column::ProductId.eq(product_id))
        .one(txn)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("No ledger row for product {}", product_id)))?;

    let now = Utc::now();
    let update = InventoryItem::update_many()
        .col_expr(
            inventory_item::Column::ProductName,
            Expr::value(product_name.clone()),
        )
        .col_expr(inventory_item::Column::Version, Expr::value(item.version + 1))
        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(now))
        .filter(inventory_item::Column::Id.eq(item.id))
        .filter(inventory_item::Column::Version.eq(item.version))
        .exec(txn)
        .await
        .map_err(ServiceError::db_error)?;

    if update.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(product_id));
    }

    append_record(txn, item.id, TransactionType::Update, "Product renamed").await?;

    Ok(inventory_item::Model {
        product_name,
        version: item.version + 1,
        updated_at: now,
        ..item
    })
}

/// Zero-quantity audit record for row lifecycle changes.
async fn append_record(
    txn: &sea_orm::DatabaseTransaction,
    inventory_item_id: i64,
    transaction_type: TransactionType,
    notes: &str,
) -> Result<(), ServiceError> {
    inventory_transaction::ActiveModel {
        inventory_item_id: Set(inventory_item_id),
        transaction_type: Set(transaction_type.as_str().to_string()),
        quantity: Set(0),
        previous_quantity: Set(0),
        new_quantity: Set(0),
        reference: Set(None),
        user_id: Set(None),
        notes: Set(Some(notes.to_string())),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(txn)
    .await
    .map_err(ServiceError::db_error)?;
    Ok(())
}

fn flatten_txn_error(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
