use crate::{
    commands::{
        catalog::{ProductCreatedCommand, ProductDeletedCommand, ProductUpdatedCommand},
        orders::{ExportCommand, ReleaseCommand, ReserveCommand, ReturnCommand, SellCommand},
        Command,
    },
    db::DbPool,
    errors::ServiceError,
    events::EventSender,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Deserialized upstream messages, ready to dispatch. Transport decoding
/// happens before a message lands here.
#[derive(Debug, Clone)]
pub enum IntakeMessage {
    Reserve(ReserveCommand),
    Sell(SellCommand),
    Release(ReleaseCommand),
    Return(ReturnCommand),
    Export(ExportCommand),
    ProductCreated(ProductCreatedCommand),
    ProductUpdated(ProductUpdatedCommand),
    ProductDeleted(ProductDeletedCommand),
}

impl IntakeMessage {
    fn kind(&self) -> &'static str {
        match self {
            IntakeMessage::Reserve(_) => "reserve",
            IntakeMessage::Sell(_) => "sell",
            IntakeMessage::Release(_) => "release",
            IntakeMessage::Return(_) => "return",
            IntakeMessage::Export(_) => "export",
            IntakeMessage::ProductCreated(_) => "product_created",
            IntakeMessage::ProductUpdated(_) => "product_updated",
            IntakeMessage::ProductDeleted(_) => "product_deleted",
        }
    }
}

/// Drains the intake channel, dispatching each message to its command.
/// A failed message is logged and dropped; the loop never stops on
/// command errors, only when every sender is gone.
pub async fn run_intake(
    mut rx: mpsc::Receiver<IntakeMessage>,
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
) {
    info!("Command intake loop started");
    while let Some(msg) = rx.recv().await {
        let kind = msg.kind();
        if let Err(e) = dispatch(msg, db_pool.clone(), event_sender.clone()).await {
            error!(message = kind, error = %e, "Intake message failed");
        }
    }
    warn!("Command intake loop has ended");
}

async fn dispatch(
    msg: IntakeMessage,
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
) -> Result<(), ServiceError> {
    match msg {
        IntakeMessage::Reserve(cmd) => {
            cmd.execute(db_pool, event_sender).await?;
        }
        IntakeMessage::Sell(cmd) => {
            cmd.execute(db_pool, event_sender).await?;
        }
        IntakeMessage::Release(cmd) => {
            cmd.execute(db_pool, event_sender).await?;
        }
        IntakeMessage::Return(cmd) => {
            cmd.execute(db_pool, event_sender).await?;
        }
        IntakeMessage::Export(cmd) => {
            cmd.execute(db_pool, event_sender).await?;
        }
        IntakeMessage::ProductCreated(cmd) => {
            cmd.execute(db_pool, event_sender).await?;
        }
        IntakeMessage::ProductUpdated(cmd) => {
            cmd.execute(db_pool, event_sender).await?;
        }
        IntakeMessage::ProductDeleted(cmd) => {
            cmd.execute(db_pool, event_sender).await?;
        }
    }
    Ok(())
}
