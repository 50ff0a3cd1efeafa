use std::sync::Arc;
use stock_ledger::db::{self, DbConfig, DbPool};
use stock_ledger::events::{process_events, EventSender};
use tokio::sync::mpsc;

/// Fresh migrated in-memory database plus a live event channel.
///
/// Every pooled `sqlite::memory:` connection is a separate database, so
/// the pool is pinned to a single connection.
pub async fn setup() -> (Arc<DbPool>, EventSender) {
    let cfg = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&cfg)
        .await
        .expect("db connect");
    db::run_migrations(&pool).await.expect("migrations");

    let (tx, rx) = mpsc::channel(100);
    tokio::spawn(process_events(rx));
    (Arc::new(pool), EventSender::new(tx))
}
