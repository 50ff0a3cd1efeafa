use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Cloneable handle for publishing domain events from services.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Domain events emitted after a committed ledger mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog lifecycle
    ItemCreated {
        product_id: i64,
    },
    ItemRenamed {
        product_id: i64,
    },
    ItemRemoved {
        product_id: i64,
    },

    // Stock movements
    StockReserved {
        product_id: i64,
        quantity: i32,
        reference: String,
        available: i32,
        low_stock_threshold: i32,
    },
    StockReleased {
        product_id: i64,
        quantity: i32,
        reference: String,
    },
    StockSold {
        product_id: i64,
        quantity: i32,
        reference: String,
        available: i32,
        low_stock_threshold: i32,
    },
    StockReturned {
        product_id: i64,
        quantity: i32,
        reference: String,
    },
    StockExported {
        product_id: i64,
        reference: String,
    },
    StockImported {
        product_id: i64,
        quantity: i32,
        new_total: i32,
    },
    StockAdjusted {
        product_id: i64,
        delta: i32,
        previous_total: i32,
        new_total: i32,
        reason: String,
    },
}

/// Processes events from the channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Event processing loop started");

    while let Some(event) = rx.recv().await {
        match event {
            Event::ItemCreated { product_id } => {
                info!(product_id, "Ledger row created");
            }
            Event::ItemRenamed { product_id } => {
                info!(product_id, "Ledger row renamed");
            }
            Event::ItemRemoved { product_id } => {
                info!(product_id, "Ledger row removed");
            }
            Event::StockReserved {
                product_id,
                quantity,
                ref reference,
                available,
                low_stock_threshold,
            } => {
                info!(product_id, quantity, %reference, "Stock reserved");
                check_stock_level(product_id, available, low_stock_threshold);
            }
            Event::StockReleased {
                product_id,
                quantity,
                ref reference,
            } => {
                info!(product_id, quantity, %reference, "Reserved stock released");
            }
            Event::StockSold {
                product_id,
                quantity,
                ref reference,
                available,
                low_stock_threshold,
            } => {
                info!(product_id, quantity, %reference, "Reserved stock sold");
                check_stock_level(product_id, available, low_stock_threshold);
            }
            Event::StockReturned {
                product_id,
                quantity,
                ref reference,
            } => {
                info!(product_id, quantity, %reference, "Sold stock returned");
            }
            Event::StockExported {
                product_id,
                ref reference,
            } => {
                info!(product_id, %reference, "Stock export recorded");
            }
            Event::StockImported {
                product_id,
                quantity,
                new_total,
            } => {
                info!(product_id, quantity, new_total, "Stock imported");
            }
            Event::StockAdjusted {
                product_id,
                delta,
                previous_total,
                new_total,
                ref reason,
            } => {
                info!(
                    product_id,
                    delta, previous_total, new_total, %reason,
                    "Stock adjusted"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}

fn check_stock_level(product_id: i64, available: i32, low_stock_threshold: i32) {
    if available == 0 {
        warn!(product_id, "Product is out of stock");
    } else if available <= low_stock_threshold {
        warn!(
            product_id,
            available, low_stock_threshold, "Product is low on stock"
        );
    }
}
