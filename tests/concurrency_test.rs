mod common;

use stock_ledger::errors::ServiceError;
use stock_ledger::services::{LedgerService, ReservationService};

/// Retries an operation while it reports a lost version race.
async fn reserve_with_retry(
    svc: &ReservationService,
    product_id: i64,
    quantity: i32,
    reference: &str,
) -> Result<(), ServiceError> {
    loop {
        match svc.reserve(product_id, quantity, reference).await {
            Ok(_) => return Ok(()),
            Err(e) if e.is_retryable() => continue,
            Err(e) => return Err(e),
        }
    }
}

#[tokio::test]
async fn concurrent_reservations_never_oversell() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db, events);

    ledger.create_item(1, "widget").await.expect("create");
    stock
        .import_stock(1, 10, "initial stock", None)
        .await
        .expect("import");

    let mut tasks = Vec::new();
    for i in 0..20 {
        let svc = stock.clone();
        tasks.push(tokio::spawn(async move {
            reserve_with_retry(&svc, 1, 1, &format!("ORDER-{}", i))
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.expect("join") {
            successes += 1;
        }
    }
    assert_eq!(
        successes, 10,
        "exactly 10 single-unit reservations should succeed"
    );

    let item = ledger.get_item(1).await.expect("get");
    assert_eq!(item.available_quantity, 0);
    assert_eq!(item.locked_quantity, 10);
    assert_eq!(item.total_quantity, 10);
}
