use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create carriers table
        manager
            .create_table(
                Table::create()
                    .table(Carriers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Carriers::Id)
                            .string_len(20)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Carriers::Name).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Create loading_sheets table
        manager
            .create_table(
                Table::create()
                    .table(LoadingSheets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoadingSheets::Id)
                            .string_len(20)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LoadingSheets::Exporter).string().not_null())
                    .col(ColumnDef::new(LoadingSheets::Client).string())
                    .col(ColumnDef::new(LoadingSheets::ShippingLine).string())
                    .col(ColumnDef::new(LoadingSheets::BillNumber).string().not_null())
                    .col(ColumnDef::new(LoadingSheets::Container).string().not_null())
                    .col(ColumnDef::new(LoadingSheets::LineSeal).string())
                    .col(ColumnDef::new(LoadingSheets::ExporterSeal).string())
                    .col(ColumnDef::new(LoadingSheets::Truck).string())
                    .col(ColumnDef::new(LoadingSheets::Vessel).string())
                    .col(ColumnDef::new(LoadingSheets::TempSetpoint).string())
                    .col(ColumnDef::new(LoadingSheets::TempRecorded).string())
                    .col(ColumnDef::new(LoadingSheets::LoadingDate).date().not_null())
                    .col(ColumnDef::new(LoadingSheets::LoadedBy).string())
                    .col(ColumnDef::new(LoadingSheets::CheckedBy).string())
                    .col(ColumnDef::new(LoadingSheets::Remarks).text())
                    .col(ColumnDef::new(LoadingSheets::AssignedCarrier).string_len(20))
                    .col(
                        ColumnDef::new(LoadingSheets::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(LoadingSheets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_loading_sheet_carrier")
                            .from(LoadingSheets::Table, LoadingSheets::AssignedCarrier)
                            .to(Carriers::Table, Carriers::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create cold_room_pallets table. Rows are owned by the inventory
        // side; this service only moves assigned_sheet.
        manager
            .create_table(
                Table::create()
                    .table(ColdRoomPallets::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ColdRoomPallets::Id)
                            .string_len(20)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ColdRoomPallets::DisplayName).string().not_null())
                    .col(ColumnDef::new(ColdRoomPallets::Variety).string().not_null())
                    .col(ColumnDef::new(ColdRoomPallets::BoxType).string().not_null())
                    .col(ColumnDef::new(ColdRoomPallets::Size).string())
                    .col(ColumnDef::new(ColdRoomPallets::Grade).string())
                    .col(
                        ColumnDef::new(ColdRoomPallets::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ColdRoomPallets::SupplierRef).string())
                    .col(ColumnDef::new(ColdRoomPallets::Region).string())
                    .col(ColumnDef::new(ColdRoomPallets::AssignedSheet).string_len(20))
                    .col(
                        ColumnDef::new(ColdRoomPallets::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pallet_loading_sheet")
                            .from(ColdRoomPallets::Table, ColdRoomPallets::AssignedSheet)
                            .to(LoadingSheets::Table, LoadingSheets::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Create loading_line_items table
        manager
            .create_table(
                Table::create()
                    .table(LoadingLineItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LoadingLineItems::SheetId)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LoadingLineItems::Sequence).integer().not_null())
                    .col(ColumnDef::new(LoadingLineItems::PalletId).string_len(20))
                    .col(ColumnDef::new(LoadingLineItems::Variety).string().not_null())
                    .col(ColumnDef::new(LoadingLineItems::BoxType).string().not_null())
                    .col(
                        ColumnDef::new(LoadingLineItems::Quantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .primary_key(
                        Index::create()
                            .col(LoadingLineItems::SheetId)
                            .col(LoadingLineItems::Sequence),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_line_item_loading_sheet")
                            .from(LoadingLineItems::Table, LoadingLineItems::SheetId)
                            .to(LoadingSheets::Table, LoadingSheets::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A pallet appears on at most one line item across all sheets
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_line_items_pallet")
                    .table(LoadingLineItems::Table)
                    .col(LoadingLineItems::PalletId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_pallets_assigned_sheet")
                    .table(ColdRoomPallets::Table)
                    .col(ColdRoomPallets::AssignedSheet)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_loading_sheets_date")
                    .table(LoadingSheets::Table)
                    .col(LoadingSheets::LoadingDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LoadingLineItems::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ColdRoomPallets::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(LoadingSheets::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Carriers::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum Carriers {
    Table,
    Id,
    Name,
}

#[derive(DeriveIden)]
enum LoadingSheets {
    Table,
    Id,
    Exporter,
    Client,
    ShippingLine,
    BillNumber,
    Container,
    LineSeal,
    ExporterSeal,
    Truck,
    Vessel,
    TempSetpoint,
    TempRecorded,
    LoadingDate,
    LoadedBy,
    CheckedBy,
    Remarks,
    AssignedCarrier,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ColdRoomPallets {
    Table,
    Id,
    DisplayName,
    Variety,
    BoxType,
    Size,
    Grade,
    Quantity,
    SupplierRef,
    Region,
    AssignedSheet,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum LoadingLineItems {
    Table,
    SheetId,
    Sequence,
    PalletId,
    Variety,
    BoxType,
    Quantity,
}
