use crate::{db::DbPool, errors::ServiceError, events::EventSender};
use async_trait::async_trait;
use std::sync::Arc;

pub mod catalog;
pub mod intake;
pub mod orders;

/// A self-contained unit of work triggered by an upstream message.
/// Commands validate their payload, drive the services, and report a
/// typed result; transport concerns stay outside.
#[async_trait]
pub trait Command: Send + Sync {
    type Result: Send + Sync;

    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}
