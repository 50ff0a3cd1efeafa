use crate::{
    commands::Command,
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
    services::ReservationService,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use validator::Validate;

lazy_static! {
    static ref ORDER_COMMANDS: IntCounterVec = prometheus::register_int_counter_vec!(
        "stock_ledger_order_commands_total",
        "Order-driven stock commands executed",
        &["operation"]
    )
    .unwrap();
    static ref ORDER_COMMAND_ITEM_FAILURES: IntCounterVec =
        prometheus::register_int_counter_vec!(
            "stock_ledger_order_command_item_failures_total",
            "Order line items that failed to apply",
            &["operation", "error"]
        )
        .unwrap();
}

/// One product line within an order message.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OrderLineItem {
    pub product_id: i64,
    #[validate(range(min = 0))]
    pub quantity: i32,
}

/// Per-line report for a processed order command. A failed line never
/// blocks the remaining lines.
#[derive(Debug, Clone, Serialize)]
pub struct LineItemOutcome {
    pub product_id: i64,
    pub quantity: i32,
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderCommandResult {
    pub order_id: String,
    pub outcomes: Vec<LineItemOutcome>,
    pub failed_items: usize,
}

#[derive(Debug, Clone, Copy)]
enum OrderOperation {
    Reserve,
    Sell,
    Release,
    Return,
    Export,
}

impl OrderOperation {
    fn name(self) -> &'static str {
        match self {
            OrderOperation::Reserve => "reserve",
            OrderOperation::Sell => "sell",
            OrderOperation::Release => "release",
            OrderOperation::Return => "return",
            OrderOperation::Export => "export",
        }
    }
}

fn error_label(err: &ServiceError) -> &'static str {
    match err {
        ServiceError::DatabaseError(_) => "database",
        ServiceError::NotFound(_) => "not_found",
        ServiceError::AlreadyExists(_) => "already_exists",
        ServiceError::InsufficientStock(_) => "insufficient_stock",
        ServiceError::InsufficientReservedQuantity(_) => "insufficient_reserved",
        ServiceError::InvalidQuantity(_) => "invalid_quantity",
        ServiceError::ConcurrentModification(_) => "concurrent_modification",
        ServiceError::ValidationError(_) => "validation",
        ServiceError::EventError(_) => "event",
        ServiceError::InternalError(_) => "internal",
    }
}

/// Applies one order operation per line item, isolating failures so one
/// bad line cannot poison the rest of the order.
async fn apply_line_items(
    op: OrderOperation,
    order_id: &str,
    items: &[OrderLineItem],
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
) -> OrderCommandResult {
    ORDER_COMMANDS.with_label_values(&[op.name()]).inc();
    let service = ReservationService::new(db_pool, (*event_sender).clone());
    let mut outcomes = Vec::with_capacity(items.len());
    let mut failed_items = 0;

    for item in items {
        let result = match op {
            OrderOperation::Reserve => {
                service
                    .reserve(item.product_id, item.quantity, order_id)
                    .await
            }
            OrderOperation::Sell => service.sell(item.product_id, item.quantity, order_id).await,
            OrderOperation::Release => {
                service
                    .release(item.product_id, item.quantity, order_id)
                    .await
            }
            OrderOperation::Return => {
                service
                    .return_stock(item.product_id, item.quantity, order_id)
                    .await
            }
            OrderOperation::Export => service.export(item.product_id, order_id).await,
        };

        match result {
            Ok(_) => outcomes.push(LineItemOutcome {
                product_id: item.product_id,
                quantity: item.quantity,
                success: true,
                error: None,
            }),
            Err(e) => {
                error!(
                    order_id,
                    product_id = item.product_id,
                    operation = op.name(),
                    error = %e,
                    "Failed to apply order line item"
                );
                ORDER_COMMAND_ITEM_FAILURES
                    .with_label_values(&[op.name(), error_label(&e)])
                    .inc();
                failed_items += 1;
                outcomes.push(LineItemOutcome {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    if failed_items > 0 {
        warn!(
            order_id,
            operation = op.name(),
            failed_items,
            total_items = items.len(),
            "Order command completed with failures"
        );
    } else {
        info!(
            order_id,
            operation = op.name(),
            total_items = items.len(),
            "Order command completed"
        );
    }

    OrderCommandResult {
        order_id: order_id.to_string(),
        outcomes,
        failed_items,
    }
}

fn validation_error(e: validator::ValidationErrors) -> ServiceError {
    ServiceError::ValidationError(e.to_string())
}

/// Locks stock for every line of a newly created order.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReserveCommand {
    #[validate(length(min = 1))]
    pub order_id: String,
    pub user_id: i64,
    #[validate]
    #[validate(length(min = 1))]
    pub items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
impl Command for ReserveCommand {
    type Result = OrderCommandResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(validation_error)?;
        Ok(apply_line_items(
            OrderOperation::Reserve,
            &self.order_id,
            &self.items,
            db_pool,
            event_sender,
        )
        .await)
    }
}

/// Converts the order's reservations into sales on payment confirmation.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SellCommand {
    #[validate(length(min = 1))]
    pub order_id: String,
    pub user_id: i64,
    #[validate]
    #[validate(length(min = 1))]
    pub items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
impl Command for SellCommand {
    type Result = OrderCommandResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(validation_error)?;
        Ok(apply_line_items(
            OrderOperation::Sell,
            &self.order_id,
            &self.items,
            db_pool,
            event_sender,
        )
        .await)
    }
}

/// Frees the order's reservations after cancellation or payment timeout.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReleaseCommand {
    #[validate(length(min = 1))]
    pub order_id: String,
    pub user_id: i64,
    #[validate]
    #[validate(length(min = 1))]
    pub items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
impl Command for ReleaseCommand {
    type Result = OrderCommandResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(validation_error)?;
        Ok(apply_line_items(
            OrderOperation::Release,
            &self.order_id,
            &self.items,
            db_pool,
            event_sender,
        )
        .await)
    }
}

/// Moves sold units back to available when an order is returned.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReturnCommand {
    #[validate(length(min = 1))]
    pub order_id: String,
    pub user_id: i64,
    #[validate]
    #[validate(length(min = 1))]
    pub items: Vec<OrderLineItem>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
impl Command for ReturnCommand {
    type Result = OrderCommandResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(validation_error)?;
        Ok(apply_line_items(
            OrderOperation::Return,
            &self.order_id,
            &self.items,
            db_pool,
            event_sender,
        )
        .await)
    }
}

/// Records delivery confirmation for every line of an order. Audit-only:
/// no bucket moves.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExportCommand {
    #[validate(length(min = 1))]
    pub order_id: String,
    #[validate]
    #[validate(length(min = 1))]
    pub items: Vec<OrderLineItem>,
}

#[async_trait]
impl Command for ExportCommand {
    type Result = OrderCommandResult;

    #[instrument(skip(self, db_pool, event_sender), fields(order_id = %self.order_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(validation_error)?;
        Ok(apply_line_items(
            OrderOperation::Export,
            &self.order_id,
            &self.items,
            db_pool,
            event_sender,
        )
        .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reserve_command_rejects_empty_items() {
        let cmd = ReserveCommand {
            order_id: "ORDER-1".to_string(),
            user_id: 1,
            items: vec![],
            created_at: Utc::now(),
        };
        assert!(cmd.validate().is_err());
    }

    #[test]
    fn line_item_rejects_negative_quantity() {
        let item = OrderLineItem {
            product_id: 1,
            quantity: -2,
        };
        assert!(item.validate().is_err());
    }

    #[test]
    fn command_validation_reaches_line_items() {
        let cmd = SellCommand {
            order_id: "ORDER-1".to_string(),
            user_id: 1,
            items: vec![
                OrderLineItem {
                    product_id: 1,
                    quantity: 5,
                },
                OrderLineItem {
                    product_id: 2,
                    quantity: -1,
                },
            ],
            created_at: Utc::now(),
        };
        assert!(cmd.validate().is_err());
    }
}
