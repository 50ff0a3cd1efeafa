use crate::{
    commands::Command,
    db::DbPool,
    entities::inventory_item,
    errors::ServiceError,
    events::EventSender,
    services::LedgerService,
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use validator::Validate;

/// Registers a ledger row when a product appears in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductCreatedCommand {
    pub product_id: i64,
    #[validate(length(min = 1))]
    pub product_name: String,
}

#[async_trait]
impl Command for ProductCreatedCommand {
    type Result = inventory_item::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(product_id = self.product_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        let service = LedgerService::new(db_pool, (*event_sender).clone());
        service
            .create_item(self.product_id, &self.product_name)
            .await
    }
}

/// Refreshes the cached product name on catalog updates. Price and
/// activation changes are catalog concerns and are ignored here.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProductUpdatedCommand {
    pub product_id: i64,
    #[validate(length(min = 1))]
    pub product_name: String,
    pub new_price: Decimal,
    pub is_active: bool,
}

#[async_trait]
impl Command for ProductUpdatedCommand {
    type Result = inventory_item::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(product_id = self.product_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;
        debug!(
            product_id = self.product_id,
            new_price = %self.new_price,
            is_active = self.is_active,
            "Catalog-only fields ignored by the ledger"
        );
        let service = LedgerService::new(db_pool, (*event_sender).clone());
        service
            .rename_item(self.product_id, &self.product_name)
            .await
    }
}

/// Drops the ledger row and its history when the product is deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDeletedCommand {
    pub product_id: i64,
}

#[async_trait]
impl Command for ProductDeletedCommand {
    type Result = ();

    #[instrument(skip(self, db_pool, event_sender), fields(product_id = self.product_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let service = LedgerService::new(db_pool, (*event_sender).clone());
        service.remove_item(self.product_id).await
    }
}
