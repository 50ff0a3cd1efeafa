use crate::{
    db::DbPool,
    entities::{
        inventory_item::{self, compute_available, Entity as InventoryItem},
        inventory_transaction::{self, TransactionType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionError,
    TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// New bucket values computed by an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Buckets {
    pub total: i32,
    pub locked: i32,
    pub sold: i32,
    pub available: i32,
}

impl Buckets {
    fn of(item: &inventory_item::Model) -> Self {
        Self {
            total: item.total_quantity,
            locked: item.locked_quantity,
            sold: item.sold_quantity,
            available: item.available_quantity,
        }
    }

    fn with_locked(self, locked: i32) -> Self {
        Self {
            locked,
            available: compute_available(self.total, locked, self.sold),
            ..self
        }
    }

    fn with_sold(self, sold: i32) -> Self {
        Self {
            sold,
            available: compute_available(self.total, self.locked, sold),
            ..self
        }
    }

    fn with_total(self, total: i32) -> Self {
        Self {
            total,
            available: compute_available(total, self.locked, self.sold),
            ..self
        }
    }
}

/// Audit record to append for the mutation, before/after values taken from
/// the bucket the operation touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDraft {
    pub transaction_type: TransactionType,
    pub quantity: i32,
    pub previous_quantity: i32,
    pub new_quantity: i32,
    pub reference: Option<String>,
    pub user_id: Option<i64>,
    pub notes: Option<String>,
}

/// Result of applying an operation to a ledger row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationOutcome {
    pub buckets: Buckets,
    pub last_sale_date: Option<DateTime<Utc>>,
    pub record: TransactionDraft,
}

/// The closed set of stock mutations. Each variant owns the whole of its
/// bucket arithmetic inside [`StockOperation::apply`], so no call site
/// repeats before/after bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockOperation {
    /// Available -> Locked against a pending order.
    Reserve { quantity: i32, reference: String },
    /// Locked -> Available when a pending order is cancelled or times out.
    Release { quantity: i32, reference: String },
    /// Locked -> Sold on payment confirmation.
    Sell { quantity: i32, reference: String },
    /// Sold -> Available when a confirmed order is returned.
    Return { quantity: i32, reference: String },
    /// Delivery confirmation: audit record and sale timestamp only,
    /// no bucket changes despite the name. Pending product clarification.
    Export { reference: String },
    /// New units brought into stock by an operator.
    Import {
        quantity: i32,
        reason: String,
        actor: Option<i64>,
    },
    /// Manual correction of the total bucket.
    Adjust { delta: i32, reason: String },
}

impl StockOperation {
    /// Validates preconditions against the row as read and computes the new
    /// bucket values plus the audit record. Pure: no I/O, no clock.
    pub fn apply(
        &self,
        item: &inventory_item::Model,
        now: DateTime<Utc>,
    ) -> Result<OperationOutcome, ServiceError> {
        let buckets = Buckets::of(item);

        match self {
            StockOperation::Reserve {
                quantity,
                reference,
            } => {
                let quantity = non_negative(*quantity, "reserve")?;
                if item.available_quantity < quantity {
                    return Err(ServiceError::InsufficientStock(format!(
                        "product {}: available {}, requested {}",
                        item.product_id, item.available_quantity, quantity
                    )));
                }
                let new = buckets.with_locked(item.locked_quantity + quantity);
                Ok(OperationOutcome {
                    buckets: new,
                    last_sale_date: item.last_sale_date,
                    record: TransactionDraft {
                        transaction_type: TransactionType::Reserve,
                        quantity,
                        previous_quantity: item.locked_quantity,
                        new_quantity: new.locked,
                        reference: Some(reference.clone()),
                        user_id: None,
                        notes: Some("Reserved pending payment".to_string()),
                    },
                })
            }
            StockOperation::Release {
                quantity,
                reference,
            } => {
                let quantity = non_negative(*quantity, "release")?;
                // Locked never drops below zero; over-release is clamped.
                let new = buckets.with_locked((item.locked_quantity - quantity).max(0));
                Ok(OperationOutcome {
                    buckets: new,
                    last_sale_date: item.last_sale_date,
                    record: TransactionDraft {
                        transaction_type: TransactionType::Release,
                        quantity,
                        previous_quantity: item.locked_quantity,
                        new_quantity: new.locked,
                        reference: Some(reference.clone()),
                        user_id: None,
                        notes: Some("Reservation released".to_string()),
                    },
                })
            }
            StockOperation::Sell {
                quantity,
                reference,
            } => {
                let quantity = non_negative(*quantity, "sell")?;
                if item.locked_quantity < quantity {
                    return Err(ServiceError::InsufficientReservedQuantity(format!(
                        "product {}: reserved {}, requested {}",
                        item.product_id, item.locked_quantity, quantity
                    )));
                }
                let new = buckets
                    .with_locked(item.locked_quantity - quantity)
                    .with_sold(item.sold_quantity + quantity);
                Ok(OperationOutcome {
                    buckets: new,
                    last_sale_date: Some(now),
                    record: TransactionDraft {
                        transaction_type: TransactionType::Sale,
                        quantity,
                        previous_quantity: item.sold_quantity,
                        new_quantity: new.sold,
                        reference: Some(reference.clone()),
                        user_id: None,
                        notes: Some("Payment confirmed".to_string()),
                    },
                })
            }
            StockOperation::Return {
                quantity,
                reference,
            } => {
                let quantity = non_negative(*quantity, "return")?;
                // Sold is clamped at zero, mirroring the release floor.
                let new = buckets.with_sold((item.sold_quantity - quantity).max(0));
                Ok(OperationOutcome {
                    buckets: new,
                    last_sale_date: item.last_sale_date,
                    record: TransactionDraft {
                        transaction_type: TransactionType::Return,
                        quantity,
                        previous_quantity: item.sold_quantity,
                        new_quantity: new.sold,
                        reference: Some(reference.clone()),
                        user_id: None,
                        notes: Some("Order returned".to_string()),
                    },
                })
            }
            StockOperation::Export { reference } => Ok(OperationOutcome {
                buckets,
                last_sale_date: Some(now),
                record: TransactionDraft {
                    transaction_type: TransactionType::Export,
                    quantity: 0,
                    previous_quantity: item.available_quantity,
                    new_quantity: item.available_quantity,
                    reference: Some(reference.clone()),
                    user_id: None,
                    notes: Some("Delivery confirmed".to_string()),
                },
            }),
            StockOperation::Import {
                quantity,
                reason,
                actor,
            } => {
                if *quantity <= 0 {
                    return Err(ServiceError::InvalidQuantity(format!(
                        "import requires a positive quantity, got {}",
                        quantity
                    )));
                }
                let new = buckets.with_total(item.total_quantity + quantity);
                Ok(OperationOutcome {
                    buckets: new,
                    last_sale_date: item.last_sale_date,
                    record: TransactionDraft {
                        transaction_type: TransactionType::ImportStock,
                        quantity: *quantity,
                        previous_quantity: item.total_quantity,
                        new_quantity: new.total,
                        reference: None,
                        user_id: *actor,
                        notes: Some(reason.clone()),
                    },
                })
            }
            StockOperation::Adjust { delta, reason } => {
                let new = buckets.with_total(item.total_quantity + delta);
                if new.available < 0 {
                    return Err(ServiceError::InvalidQuantity(format!(
                        "adjustment of {} would drive available below zero (locked {}, sold {})",
                        delta, item.locked_quantity, item.sold_quantity
                    )));
                }
                Ok(OperationOutcome {
                    buckets: new,
                    last_sale_date: item.last_sale_date,
                    record: TransactionDraft {
                        transaction_type: TransactionType::Adjustment,
                        quantity: *delta,
                        previous_quantity: item.total_quantity,
                        new_quantity: new.total,
                        reference: None,
                        user_id: None,
                        notes: Some(reason.clone()),
                    },
                })
            }
        }
    }
}

fn non_negative(quantity: i32, operation: &str) -> Result<i32, ServiceError> {
    if quantity < 0 {
        return Err(ServiceError::InvalidQuantity(format!(
            "{} quantity must not be negative, got {}",
            operation, quantity
        )));
    }
    Ok(quantity)
}

/// Executes stock operations as single-row atomic transactions.
#[derive(Clone)]
pub struct ReservationService {
    db_pool: Arc<DbPool>,
    event_sender: EventSender,
}

impl ReservationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Moves units from available into locked against an order reference.
    #[instrument(skip(self))]
    pub async fn reserve(
        &self,
        product_id: i64,
        quantity: i32,
        reference: &str,
    ) -> Result<inventory_item::Model, ServiceError> {
        let item = self
            .execute_operation(
                product_id,
                StockOperation::Reserve {
                    quantity,
                    reference: reference.to_string(),
                },
            )
            .await?;
        info!(product_id, quantity, reference, "Reserved stock");
        self.publish(Event::StockReserved {
            product_id,
            quantity,
            reference: reference.to_string(),
            available: item.available_quantity,
            low_stock_threshold: item.low_stock_threshold,
        })
        .await?;
        Ok(item)
    }

    /// Returns locked units to available when a pending order goes away.
    #[instrument(skip(self))]
    pub async fn release(
        &self,
        product_id: i64,
        quantity: i32,
        reference: &str,
    ) -> Result<inventory_item::Model, ServiceError> {
        let item = self
            .execute_operation(
                product_id,
                StockOperation::Release {
                    quantity,
                    reference: reference.to_string(),
                },
            )
            .await?;
        info!(product_id, quantity, reference, "Released reserved stock");
        self.publish(Event::StockReleased {
            product_id,
            quantity,
            reference: reference.to_string(),
        })
        .await?;
        Ok(item)
    }

    /// Confirms previously reserved units as sold.
    #[instrument(skip(self))]
    pub async fn sell(
        &self,
        product_id: i64,
        quantity: i32,
        reference: &str,
    ) -> Result<inventory_item::Model, ServiceError> {
        let item = self
            .execute_operation(
                product_id,
                StockOperation::Sell {
                    quantity,
                    reference: reference.to_string(),
                },
            )
            .await?;
        info!(product_id, quantity, reference, "Sold reserved stock");
        self.publish(Event::StockSold {
            product_id,
            quantity,
            reference: reference.to_string(),
            available: item.available_quantity,
            low_stock_threshold: item.low_stock_threshold,
        })
        .await?;
        Ok(item)
    }

    /// Moves sold units back to available on a return.
    #[instrument(skip(self))]
    pub async fn return_stock(
        &self,
        product_id: i64,
        quantity: i32,
        reference: &str,
    ) -> Result<inventory_item::Model, ServiceError> {
        let item = self
            .execute_operation(
                product_id,
                StockOperation::Return {
                    quantity,
                    reference: reference.to_string(),
                },
            )
            .await?;
        info!(product_id, quantity, reference, "Returned sold stock");
        self.publish(Event::StockReturned {
            product_id,
            quantity,
            reference: reference.to_string(),
        })
        .await?;
        Ok(item)
    }

    /// Records a delivery confirmation in the audit trail.
    #[instrument(skip(self))]
    pub async fn export(
        &self,
        product_id: i64,
        reference: &str,
    ) -> Result<inventory_item::Model, ServiceError> {
        let item = self
            .execute_operation(
                product_id,
                StockOperation::Export {
                    reference: reference.to_string(),
                },
            )
            .await?;
        info!(product_id, reference, "Recorded stock export");
        self.publish(Event::StockExported {
            product_id,
            reference: reference.to_string(),
        })
        .await?;
        Ok(item)
    }

    /// Brings new units into stock. The quantity must be positive.
    #[instrument(skip(self))]
    pub async fn import_stock(
        &self,
        product_id: i64,
        quantity: i32,
        reason: &str,
        actor: Option<i64>,
    ) -> Result<inventory_item::Model, ServiceError> {
        let item = self
            .execute_operation(
                product_id,
                StockOperation::Import {
                    quantity,
                    reason: reason.to_string(),
                    actor,
                },
            )
            .await?;
        info!(product_id, quantity, reason, "Imported stock");
        self.publish(Event::StockImported {
            product_id,
            quantity,
            new_total: item.total_quantity,
        })
        .await?;
        Ok(item)
    }

    /// Manually corrects the total bucket by a signed delta.
    #[instrument(skip(self))]
    pub async fn adjust_stock(
        &self,
        product_id: i64,
        delta: i32,
        reason: &str,
    ) -> Result<inventory_item::Model, ServiceError> {
        let item = self
            .execute_operation(
                product_id,
                StockOperation::Adjust {
                    delta,
                    reason: reason.to_string(),
                },
            )
            .await?;
        info!(product_id, delta, reason, "Adjusted stock");
        self.publish(Event::StockAdjusted {
            product_id,
            delta,
            previous_total: item.total_quantity - delta,
            new_total: item.total_quantity,
            reason: reason.to_string(),
        })
        .await?;
        Ok(item)
    }

    /// Runs one operation as a single transaction: read the row, validate and
    /// compute via `apply`, write the new buckets guarded by the version read,
    /// append the audit record, commit. A lost version race aborts the whole
    /// transaction with `ConcurrentModification`; nothing is written then.
    async fn execute_operation(
        &self,
        product_id: i64,
        op: StockOperation,
    ) -> Result<inventory_item::Model, ServiceError> {
        let db = self.db_pool.as_ref();
        db.transaction::<_, inventory_item::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let item = InventoryItem::find()
                    .filter(inventory_item::Column::ProductId.eq(product_id))
                    .one(txn)
                    .await
                    .map_err(ServiceError::db_error)?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("No ledger row for product {}", product_id))
                    })?;

                apply_to_row(txn, item, &op).await
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn publish(&self, event: Event) -> Result<(), ServiceError> {
        self.event_sender
            .send(event)
            .await
            .map_err(ServiceError::EventError)
    }
}

/// Writes one operation against the row snapshot already read in this
/// transaction. The update is filtered on the snapshot's version; a row
/// changed since the read matches nothing, and the lost race surfaces as
/// `ConcurrentModification` with no write.
async fn apply_to_row(
    txn: &sea_orm::DatabaseTransaction,
    item: inventory_item::Model,
    op: &StockOperation,
) -> Result<inventory_item::Model, ServiceError> {
    let now = Utc::now();
    let outcome = op.apply(&item, now)?;

    let update = InventoryItem::update_many()
        .col_expr(
            inventory_item::Column::TotalQuantity,
            Expr::value(outcome.buckets.total),
        )
        .col_expr(
            inventory_item::Column::LockedQuantity,
            Expr::value(outcome.buckets.locked),
        )
        .col_expr(
            inventory_item::Column::SoldQuantity,
            Expr::value(outcome.buckets.sold),
        )
        .col_expr(
            inventory_item::Column::AvailableQuantity,
            Expr::value(outcome.buckets.available),
        )
        .col_expr(
            inventory_item::Column::LastSaleDate,
            Expr::value(outcome.last_sale_date),
        )
        .col_expr(
            inventory_item::Column::Version,
            Expr::value(item.version + 1),
        )
        .col_expr(inventory_item::Column::UpdatedAt, Expr::value(now))
        .filter(inventory_item::Column::Id.eq(item.id))
        .filter(inventory_item::Column::Version.eq(item.version))
        .exec(txn)
        .await
        .map_err(ServiceError::db_error)?;

    if update.rows_affected == 0 {
        return Err(ServiceError::ConcurrentModification(item.product_id));
    }

    let record = inventory_transaction::ActiveModel {
        inventory_item_id: Set(item.id),
        transaction_type: Set(outcome.record.transaction_type.as_str().to_string()),
        quantity: Set(outcome.record.quantity),
        previous_quantity: Set(outcome.record.previous_quantity),
        new_quantity: Set(outcome.record.new_quantity),
        reference: Set(outcome.record.reference),
        user_id: Set(outcome.record.user_id),
        notes: Set(outcome.record.notes),
        created_at: Set(now),
        ..Default::default()
    };
    record.insert(txn).await.map_err(ServiceError::db_error)?;

    Ok(inventory_item::Model {
        total_quantity: outcome.buckets.total,
        locked_quantity: outcome.buckets.locked,
        sold_quantity: outcome.buckets.sold,
        available_quantity: outcome.buckets.available,
        last_sale_date: outcome.last_sale_date,
        version: item.version + 1,
        updated_at: now,
        ..item
    })
}
