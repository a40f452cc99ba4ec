//! Allocation use cases against the SQLite-backed store with the real schema.

use std::sync::Arc;

use application::{AllocationService, AllocationSettings};
use chrono::{NaiveDate, Utc};
use domain::{ErrorKind, PalletAssignment, PalletId, SheetFields};
use infrastructure::database::entities::cold_room_pallets;
use infrastructure::{SeaOrmAllocationStore, TimestampSheetIdGenerator};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, EntityTrait, Set};

async fn setup(pallets: &[&str]) -> (DatabaseConnection, AllocationService<SeaOrmAllocationStore>) {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).sqlx_logging(false);
    let db = Database::connect(options).await.expect("Failed to open database");
    Migrator::up(&db, None).await.expect("Failed to run migrations");

    for id in pallets {
        cold_room_pallets::Entity::insert(cold_room_pallets::ActiveModel {
            id: Set(id.to_string()),
            display_name: Set(format!("Pallet {id}")),
            variety: Set("Hass".to_string()),
            box_type: Set("4kg".to_string()),
            size: Set(Some("18".to_string())),
            grade: Set(Some("Cat I".to_string())),
            quantity: Set(40),
            supplier_ref: Set(None),
            region: Set(None),
            assigned_sheet: Set(None),
            updated_at: Set(Utc::now().fixed_offset()),
        })
        .exec_without_returning(&db)
        .await
        .expect("Failed to seed pallet");
    }

    let service = AllocationService::new(
        Arc::new(SeaOrmAllocationStore::new(db.clone())),
        Arc::new(TimestampSheetIdGenerator::default()),
        AllocationSettings::default(),
    );
    (db, service)
}

fn fields() -> SheetFields {
    SheetFields::new(
        "Agro Export",
        "BL-0001",
        "MSKU1234567",
        NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
    )
}

fn assign(ids: &[&str]) -> Vec<PalletAssignment> {
    ids.iter()
        .map(|id| PalletAssignment::for_pallet(PalletId::new(*id).unwrap()).with_quantity(40))
        .collect()
}

async fn assigned_sheet(db: &DatabaseConnection, id: &str) -> Option<String> {
    cold_room_pallets::Entity::find_by_id(id.to_string())
        .one(db)
        .await
        .unwrap()
        .unwrap()
        .assigned_sheet
}

#[tokio::test]
async fn test_sheet_lifecycle() {
    let (db, service) = setup(&["p1", "p2", "p3", "p4"]).await;

    let sheet = service
        .create(fields(), assign(&["p1", "p2", "p3"]))
        .await
        .unwrap();
    assert_eq!(sheet.line_items.len(), 3);
    assert_eq!(assigned_sheet(&db, "p1").await.as_deref(), Some(sheet.id.as_str()));

    let updated = service
        .update(&sheet.id, fields(), Some(assign(&["p2", "p3", "p4"])))
        .await
        .unwrap();
    assert_eq!(updated.line_items.len(), 3);
    assert_eq!(assigned_sheet(&db, "p1").await, None);
    assert_eq!(assigned_sheet(&db, "p4").await.as_deref(), Some(sheet.id.as_str()));

    service.delete(&sheet.id).await.unwrap();
    for id in ["p1", "p2", "p3", "p4"] {
        assert_eq!(assigned_sheet(&db, id).await, None);
    }
    assert_eq!(
        service.get(&sheet.id).await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
}

#[tokio::test]
async fn test_conflicting_create_is_atomic() {
    let (db, service) = setup(&["p1", "p2", "p3"]).await;
    let first = service.create(fields(), assign(&["p1"])).await.unwrap();

    let err = service
        .create(fields(), assign(&["p2", "p1", "p3"]))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.conflicts().unwrap()[0].sheet_id, first.id);
    assert_eq!(assigned_sheet(&db, "p2").await, None);
    assert_eq!(assigned_sheet(&db, "p3").await, None);
    assert_eq!(service.available_pallets().await.unwrap().len(), 2);
}
