use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InventoryTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InventoryTransactions::Id)
                            .big_integer()
                            .auto_increment()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::InventoryItemId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::PreviousQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::NewQuantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::Reference)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(InventoryTransactions::UserId)
                            .big_integer()
                            .null(),
                    )
                    .col(ColumnDef::new(InventoryTransactions::Notes).text().null())
                    .col(
                        ColumnDef::new(InventoryTransactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inventory_transactions_item")
                            .from(
                                InventoryTransactions::Table,
                                InventoryTransactions::InventoryItemId,
                            )
                            .to(InventoryItems::Table, InventoryItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Order-correlation lookups
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_transactions_reference")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::Reference)
                    .to_owned(),
            )
            .await?;

        // Chronological audit queries
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_inventory_transactions_created_at")
                    .table(InventoryTransactions::Table)
                    .col(InventoryTransactions::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(InventoryTransactions::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum InventoryTransactions {
    Table,
    Id,
    InventoryItemId,
    TransactionType,
    Quantity,
    PreviousQuantity,
    NewQuantity,
    Reference,
    UserId,
    Notes,
    CreatedAt,
}

#[derive(DeriveIden)]
enum InventoryItems {
    Table,
    Id,
}
