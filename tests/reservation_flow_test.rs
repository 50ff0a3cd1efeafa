mod common;

use chrono::{Duration, Utc};
use stock_ledger::errors::ServiceError;
use stock_ledger::queries::{
    GetAvailableQuantityQuery, GetSoldQuantityQuery, GetTransactionsByDateRangeQuery,
    GetTransactionsByItemQuery, GetTransactionsByReferenceQuery, Query,
};
use stock_ledger::services::{LedgerService, ReservationService};

#[tokio::test]
async fn order_lifecycle_moves_stock_through_the_buckets() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db.clone(), events);

    ledger.create_item(1, "widget").await.expect("create");
    stock
        .import_stock(1, 100, "initial stock", Some(7))
        .await
        .expect("import");

    let reserved = stock.reserve(1, 10, "ORDER-1").await.expect("reserve");
    assert_eq!(reserved.available_quantity, 90);
    assert_eq!(reserved.locked_quantity, 10);
    assert_eq!(reserved.total_quantity, 100);

    let sold = stock.sell(1, 10, "ORDER-1").await.expect("sell");
    assert_eq!(sold.locked_quantity, 0);
    assert_eq!(sold.sold_quantity, 10);
    assert_eq!(sold.available_quantity, 90);
    assert!(sold.last_sale_date.is_some());

    let exported = stock.export(1, "ORDER-1").await.expect("export");
    assert_eq!(exported.sold_quantity, 10);
    assert_eq!(exported.available_quantity, 90);

    let returned = stock.return_stock(1, 4, "ORDER-1").await.expect("return");
    assert_eq!(returned.sold_quantity, 6);
    assert_eq!(returned.available_quantity, 94);

    let available = GetAvailableQuantityQuery { product_id: 1 }
        .execute(db.as_ref())
        .await
        .expect("available");
    assert_eq!(available, 94);
    let sold = GetSoldQuantityQuery { product_id: 1 }
        .execute(db.as_ref())
        .await
        .expect("sold");
    assert_eq!(sold, 6);
}

#[tokio::test]
async fn cancelled_order_releases_its_reservation() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db, events);

    ledger.create_item(1, "widget").await.expect("create");
    stock
        .import_stock(1, 20, "initial stock", None)
        .await
        .expect("import");
    stock.reserve(1, 8, "ORDER-2").await.expect("reserve");

    let released = stock.release(1, 8, "ORDER-2").await.expect("release");
    assert_eq!(released.locked_quantity, 0);
    assert_eq!(released.available_quantity, 20);
}

#[tokio::test]
async fn failed_reserve_leaves_row_and_history_untouched() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db.clone(), events);

    ledger.create_item(1, "widget").await.expect("create");
    stock
        .import_stock(1, 5, "initial stock", None)
        .await
        .expect("import");

    let before = GetTransactionsByItemQuery {
        product_id: 1,
        page: 1,
        limit: 50,
    }
    .execute(db.as_ref())
    .await
    .expect("history before");

    let err = stock.reserve(1, 6, "ORDER-3").await.unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    let item = ledger.get_item(1).await.expect("get");
    assert_eq!(item.available_quantity, 5);
    assert_eq!(item.locked_quantity, 0);

    let after = GetTransactionsByItemQuery {
        product_id: 1,
        page: 1,
        limit: 50,
    }
    .execute(db.as_ref())
    .await
    .expect("history after");
    assert_eq!(after.total, before.total, "no audit record on failure");
}

#[tokio::test]
async fn selling_more_than_reserved_fails() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db, events);

    ledger.create_item(1, "widget").await.expect("create");
    stock
        .import_stock(1, 10, "initial stock", None)
        .await
        .expect("import");
    stock.reserve(1, 3, "ORDER-4").await.expect("reserve");

    let err = stock.sell(1, 4, "ORDER-4").await.unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientReservedQuantity(_)));
}

#[tokio::test]
async fn zero_quantity_reserve_is_a_recorded_no_op() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db.clone(), events);

    ledger.create_item(1, "widget").await.expect("create");
    stock
        .import_stock(1, 10, "initial stock", None)
        .await
        .expect("import");

    let item = stock.reserve(1, 0, "ORDER-5").await.expect("reserve zero");
    assert_eq!(item.available_quantity, 10);
    assert_eq!(item.locked_quantity, 0);

    let history = GetTransactionsByReferenceQuery {
        reference: "ORDER-5".to_string(),
    }
    .execute(db.as_ref())
    .await
    .expect("by reference");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].previous_quantity, history[0].new_quantity);
}

#[tokio::test]
async fn invalid_imports_and_adjustments_are_rejected() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db, events);

    ledger.create_item(1, "widget").await.expect("create");
    stock
        .import_stock(1, 10, "initial stock", None)
        .await
        .expect("import");
    stock.reserve(1, 4, "ORDER-6").await.expect("reserve");

    let err = stock.import_stock(1, 0, "nothing", None).await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidQuantity(_)));

    // locked 4, so total may shrink by at most 6
    let err = stock.adjust_stock(1, -7, "shrinkage").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidQuantity(_)));

    let adjusted = stock.adjust_stock(1, -6, "shrinkage").await.expect("adjust");
    assert_eq!(adjusted.total_quantity, 4);
    assert_eq!(adjusted.available_quantity, 0);
    assert_eq!(adjusted.locked_quantity, 4);
}

#[tokio::test]
async fn history_is_queryable_by_reference_pages_and_date_range() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db.clone(), events);

    let start = Utc::now() - Duration::seconds(1);

    ledger.create_item(1, "widget").await.expect("create");
    stock
        .import_stock(1, 50, "initial stock", None)
        .await
        .expect("import");
    stock.reserve(1, 10, "ORDER-7").await.expect("reserve");
    stock.sell(1, 10, "ORDER-7").await.expect("sell");
    stock.return_stock(1, 2, "ORDER-7").await.expect("return");

    let by_ref = GetTransactionsByReferenceQuery {
        reference: "ORDER-7".to_string(),
    }
    .execute(db.as_ref())
    .await
    .expect("by reference");
    assert_eq!(by_ref.len(), 3);
    let types: Vec<&str> = by_ref.iter().map(|t| t.transaction_type.as_str()).collect();
    assert!(types.contains(&"RESERVE"));
    assert!(types.contains(&"SALE"));
    assert!(types.contains(&"RETURN"));

    // CREATE + IMPORT_STOCK + the three order records
    let page = GetTransactionsByItemQuery {
        product_id: 1,
        page: 1,
        limit: 2,
    }
    .execute(db.as_ref())
    .await
    .expect("page 1");
    assert_eq!(page.total, 5);
    assert_eq!(page.transactions.len(), 2);

    let last_page = GetTransactionsByItemQuery {
        product_id: 1,
        page: 3,
        limit: 2,
    }
    .execute(db.as_ref())
    .await
    .expect("page 3");
    assert_eq!(last_page.transactions.len(), 1);

    let in_window = GetTransactionsByDateRangeQuery {
        from: start,
        to: Utc::now() + Duration::seconds(1),
    }
    .execute(db.as_ref())
    .await
    .expect("date range");
    assert_eq!(in_window.len(), 5);

    let before_window = GetTransactionsByDateRangeQuery {
        from: start - Duration::hours(2),
        to: start - Duration::hours(1),
    }
    .execute(db.as_ref())
    .await
    .expect("empty range");
    assert!(before_window.is_empty());
}
