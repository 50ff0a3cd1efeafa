mod common;

use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use stock_ledger::entities::inventory_transaction::{self, Entity as InventoryTransaction};
use stock_ledger::errors::ServiceError;
use stock_ledger::queries::{
    GetActiveItemsQuery, GetAvailableItemsQuery, GetItemsNeedingReorderQuery,
    GetLowStockItemsQuery, GetTransactionsByItemQuery, Query,
};
use stock_ledger::services::{LedgerService, ReservationService};

#[tokio::test]
async fn registering_a_product_starts_empty_with_defaults() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events);

    let item = ledger.create_item(1, "widget").await.expect("create");
    assert_eq!(item.product_id, 1);
    assert_eq!(item.product_name, "widget");
    assert_eq!(item.total_quantity, 0);
    assert_eq!(item.locked_quantity, 0);
    assert_eq!(item.sold_quantity, 0);
    assert_eq!(item.available_quantity, 0);
    assert_eq!(item.low_stock_threshold, 5);
    assert_eq!(item.reorder_point, 10);
    assert_eq!(item.version, 0);
    assert!(item.is_active);

    let page = GetTransactionsByItemQuery {
        product_id: 1,
        page: 1,
        limit: 10,
    }
    .execute(db.as_ref())
    .await
    .expect("history");
    assert_eq!(page.total, 1);
    assert_eq!(page.transactions[0].transaction_type, "CREATE");
    assert_eq!(page.transactions[0].quantity, 0);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db, events);

    ledger.create_item(1, "widget").await.expect("create");
    let err = ledger.create_item(1, "widget again").await.unwrap_err();
    assert!(matches!(err, ServiceError::AlreadyExists(_)));
}

#[tokio::test]
async fn renaming_bumps_version_and_records_an_update() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events);

    ledger.create_item(1, "widget").await.expect("create");
    let renamed = ledger.rename_item(1, "gadget").await.expect("rename");
    assert_eq!(renamed.product_name, "gadget");
    assert_eq!(renamed.version, 1);

    let fetched = ledger.get_item(1).await.expect("get");
    assert_eq!(fetched.product_name, "gadget");

    let page = GetTransactionsByItemQuery {
        product_id: 1,
        page: 1,
        limit: 10,
    }
    .execute(db.as_ref())
    .await
    .expect("history");
    assert_eq!(page.total, 2);
    assert!(page
        .transactions
        .iter()
        .any(|t| t.transaction_type == "UPDATE"));
}

#[tokio::test]
async fn renaming_an_unknown_product_fails() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db, events);

    let err = ledger.rename_item(99, "ghost").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn removal_drops_the_row_and_its_history() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db.clone(), events);

    let item = ledger.create_item(1, "widget").await.expect("create");
    stock
        .import_stock(1, 10, "initial stock", None)
        .await
        .expect("import");

    ledger.remove_item(1).await.expect("remove");

    let err = ledger.get_item(1).await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let leftover = InventoryTransaction::find()
        .filter(inventory_transaction::Column::InventoryItemId.eq(item.id))
        .count(db.as_ref())
        .await
        .expect("count");
    assert_eq!(leftover, 0, "cascade should remove audit records");
}

#[tokio::test]
async fn stock_level_listings_classify_items() {
    let (db, events) = common::setup().await;
    let ledger = LedgerService::new(db.clone(), events.clone());
    let stock = ReservationService::new(db.clone(), events);

    // plentiful: well above both thresholds
    ledger.create_item(1, "plentiful").await.expect("create");
    stock
        .import_stock(1, 100, "seed", None)
        .await
        .expect("import");

    // low: above zero, at the low-stock threshold of 5
    ledger.create_item(2, "low").await.expect("create");
    stock.import_stock(2, 5, "seed", None).await.expect("import");

    // empty: never stocked
    ledger.create_item(3, "empty").await.expect("create");

    let active = GetActiveItemsQuery.execute(db.as_ref()).await.expect("active");
    assert_eq!(active.len(), 3);

    // sellable flag defaults to true, so all three rows are listed
    let available = GetAvailableItemsQuery
        .execute(db.as_ref())
        .await
        .expect("available");
    assert_eq!(available.len(), 3);

    let low = GetLowStockItemsQuery
        .execute(db.as_ref())
        .await
        .expect("low stock");
    let low_ids: Vec<i64> = low.iter().map(|i| i.product_id).collect();
    assert_eq!(low_ids, vec![2]);

    let reorder = GetItemsNeedingReorderQuery
        .execute(db.as_ref())
        .await
        .expect("reorder");
    let reorder_ids: Vec<i64> = reorder.iter().map(|i| i.product_id).collect();
    assert!(reorder_ids.contains(&2));
    assert!(reorder_ids.contains(&3));
    assert!(!reorder_ids.contains(&1));
}
