use std::sync::Arc;

use application::{AllocationService, AllocationSettings, BoxWeights};
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use domain::{
    AllocationError, AllocationStore, Carrier, CarrierId, ColdRoomPallet, LoadingSheet, PageRequest,
    PalletId, SheetFilter, SheetId, SheetPage,
};
use infrastructure::database::InMemoryAllocationTx;
use infrastructure::{InMemoryAllocationStore, TimestampSheetIdGenerator};
use loading_server::{AppState, create_router};
use serde_json::{Value, json};
use tower::ServiceExt;

fn pid(id: &str) -> PalletId {
    PalletId::new(id).unwrap()
}

async fn setup() -> (InMemoryAllocationStore, Router) {
    let store = InMemoryAllocationStore::with_pallets(
        ["P-001", "P-002", "P-003", "P-004"]
            .into_iter()
            .map(|id| ColdRoomPallet::new(pid(id), format!("Pallet {id}"), "Hass", "4kg", 80)),
    );
    store
        .add_carrier(Carrier {
            id: CarrierId::new("TRK-1").unwrap(),
            name: "Cold Haul".to_string(),
        })
        .await;

    let service = AllocationService::new(
        Arc::new(store.clone()),
        Arc::new(TimestampSheetIdGenerator::default()),
        AllocationSettings::default(),
    );
    let state = AppState::new(service, BoxWeights::default()).with_paging(2, 50);
    (store, create_router(Arc::new(state)))
}

/// Store whose every call is aborted as if the database hit a lock timeout.
struct LockedStore;

fn lock_timeout() -> AllocationError {
    AllocationError::Transient("canceling statement due to lock timeout".to_string())
}

#[async_trait]
impl AllocationStore for LockedStore {
    type Tx = InMemoryAllocationTx;

    async fn begin(&self) -> Result<Self::Tx, AllocationError> {
        Err(lock_timeout())
    }

    async fn find_sheet(&self, _id: &SheetId) -> Result<Option<LoadingSheet>, AllocationError> {
        Err(lock_timeout())
    }

    async fn list_sheets(
        &self,
        _filter: &SheetFilter,
        _page: PageRequest,
    ) -> Result<SheetPage, AllocationError> {
        Err(lock_timeout())
    }

    async fn available_pallets(&self) -> Result<Vec<ColdRoomPallet>, AllocationError> {
        Err(lock_timeout())
    }
}

fn locked_app() -> Router {
    let service = AllocationService::new(
        Arc::new(LockedStore),
        Arc::new(TimestampSheetIdGenerator::default()),
        AllocationSettings::default(),
    );
    create_router(Arc::new(AppState::new(service, BoxWeights::default())))
}

fn sheet_body(pallets: &[&str]) -> Value {
    json!({
        "exporter": "Agro Export",
        "client": "Fresh Imports",
        "bill_number": "BL-7781",
        "container": "MSKU7781000",
        "loading_date": "2024-06-14",
        "loaded_by": "Ana",
        "pallets": pallets
            .iter()
            .map(|p| json!({ "pallet_id": p, "quantity": 40 }))
            .collect::<Vec<_>>(),
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, bytes) = send_raw(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn send_raw(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, bytes.to_vec())
}

async fn create(app: &Router, pallets: &[&str]) -> String {
    let (status, body) = send(app, "POST", "/api/loading-sheets", Some(sheet_body(pallets))).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let (_, app) = setup().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_create_returns_sheet_and_binds_pallets() {
    let (store, app) = setup().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/loading-sheets",
        Some(sheet_body(&["P-001", "P-002"])),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_str().unwrap();
    assert!(id.starts_with("LS"));
    assert_eq!(body["line_items"].as_array().unwrap().len(), 2);
    assert_eq!(body["line_items"][0]["sequence"], 1);
    assert_eq!(body["line_items"][1]["pallet_id"], "P-002");
    assert_eq!(body["total_quantity"], 80);
    assert_eq!(body["loading_date"], "2024-06-14");

    let p1 = store.pallet(&pid("P-001")).await.unwrap();
    assert_eq!(p1.assigned_sheet.unwrap().as_str(), id);
}

#[tokio::test]
async fn test_absent_optionals_render_as_empty_strings() {
    let (_, app) = setup().await;
    let id = create(&app, &["P-001"]).await;

    let (status, body) = send(&app, "GET", &format!("/api/loading-sheets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["vessel"], "");
    assert_eq!(body["remarks"], "");
    assert_eq!(body["assigned_carrier"], "");
    assert_eq!(body["client"], "Fresh Imports");
}

#[tokio::test]
async fn test_create_conflict_is_400_with_conflicts() {
    let (store, app) = setup().await;
    let first = create(&app, &["P-001", "P-002"]).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/loading-sheets",
        Some(sheet_body(&["P-002", "P-003"])),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "conflict");
    assert_eq!(body["retryable"], false);
    let conflicts = body["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["pallet_id"], "P-002");
    assert_eq!(conflicts[0]["sheet_id"], first.as_str());

    assert_eq!(store.sheet_count().await, 1);
    assert!(store.pallet(&pid("P-003")).await.unwrap().is_available());
}

#[tokio::test]
async fn test_create_validation_errors() {
    let (_, app) = setup().await;

    let mut body = sheet_body(&["P-001"]);
    body["exporter"] = Value::Null;
    let (status, err) = send(&app, "POST", "/api/loading-sheets", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "validation");
    assert!(err["message"].as_str().unwrap().contains("exporter"));
    assert!(err.get("conflicts").is_none());

    let mut body = sheet_body(&["P-001"]);
    body["loading_date"] = json!("14/06/2024");
    let (status, err) = send(&app, "POST", "/api/loading-sheets", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(err["message"].as_str().unwrap().contains("loading_date"));

    let (status, _) = send(&app, "POST", "/api/loading-sheets", Some(sheet_body(&[]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/api/loading-sheets",
        Some(sheet_body(&["P-001", "P-001"])),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (_, app) = setup().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/loading-sheets")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_pallet_is_404() {
    let (_, app) = setup().await;
    let (status, body) = send(
        &app,
        "POST",
        "/api/loading-sheets",
        Some(sheet_body(&["P-404"])),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_get_missing_and_malformed_ids() {
    let (_, app) = setup().await;

    let (status, _) = send(&app, "GET", "/api/loading-sheets/LS-NOPE", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "GET", "/api/loading-sheets/bad.id", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation");
}

#[tokio::test]
async fn test_update_reconciles_pallets() {
    let (store, app) = setup().await;
    let id = create(&app, &["P-001", "P-002"]).await;

    let mut body = sheet_body(&["P-002", "P-003"]);
    body["vessel"] = json!("MSC Aurora");
    let (status, updated) =
        send(&app, "PUT", &format!("/api/loading-sheets/{id}"), Some(body)).await;

    assert_eq!(status, StatusCode::OK, "{updated}");
    assert_eq!(updated["vessel"], "MSC Aurora");
    let pallets: Vec<&str> = updated["line_items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["pallet_id"].as_str().unwrap())
        .collect();
    assert_eq!(pallets, vec!["P-002", "P-003"]);

    assert!(store.pallet(&pid("P-001")).await.unwrap().is_available());
    assert!(!store.pallet(&pid("P-003")).await.unwrap().is_available());
}

#[tokio::test]
async fn test_update_without_pallets_keeps_them() {
    let (_, app) = setup().await;
    let id = create(&app, &["P-001"]).await;

    let mut body = sheet_body(&[]);
    body.as_object_mut().unwrap().remove("pallets");
    body["remarks"] = json!("Door 3");
    let (status, updated) =
        send(&app, "PUT", &format!("/api/loading-sheets/{id}"), Some(body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["remarks"], "Door 3");
    assert_eq!(updated["line_items"][0]["pallet_id"], "P-001");
}

#[tokio::test]
async fn test_delete_echoes_sheet_and_releases() {
    let (store, app) = setup().await;
    let id = create(&app, &["P-001", "P-002"]).await;

    let (status, body) = send(&app, "DELETE", &format!("/api/loading-sheets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["line_items"].as_array().unwrap().len(), 2);

    assert_eq!(store.sheet_count().await, 0);
    assert!(store.pallet(&pid("P-001")).await.unwrap().is_available());

    let (status, _) = send(&app, "DELETE", &format!("/api/loading-sheets/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_carrier_assign_and_clear() {
    let (_, app) = setup().await;
    let id = create(&app, &["P-001"]).await;
    let uri = format!("/api/loading-sheets/{id}/carrier");

    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "carrier_id": "TRK-1" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assigned_carrier"], "TRK-1");

    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "carrier_id": "TRK-9" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = send(&app, "PUT", &uri, Some(json!({ "carrier_id": null }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["assigned_carrier"], "");
}

#[tokio::test]
async fn test_list_pages_and_filters() {
    let (_, app) = setup().await;
    create(&app, &["P-001"]).await;
    create(&app, &["P-002"]).await;
    create(&app, &["P-003"]).await;

    let (status, body) = send(&app, "GET", "/api/loading-sheets", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 1);
    assert_eq!(body["page_size"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let (_, body) = send(&app, "GET", "/api/loading-sheets?page=2", None).await;
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/api/loading-sheets?client=fresh", None).await;
    assert_eq!(body["total"], 3);

    let (_, body) = send(&app, "GET", "/api/loading-sheets?client=nobody", None).await;
    assert_eq!(body["total"], 0);

    let (status, _) = send(&app, "GET", "/api/loading-sheets?carrier=maybe", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, "GET", "/api/loading-sheets?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_conflict_check_endpoint() {
    let (_, app) = setup().await;
    let id = create(&app, &["P-001", "P-002"]).await;

    let (status, body) = send(
        &app,
        "POST",
        "/api/loading-sheets/conflicts",
        Some(json!({ "pallet_ids": ["P-002", "P-003"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conflicts = body["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["pallet_id"], "P-002");
    assert_eq!(conflicts[0]["display_name"], "Pallet P-002");

    let (_, body) = send(
        &app,
        "POST",
        "/api/loading-sheets/conflicts",
        Some(json!({ "pallet_ids": ["P-002"], "exclude_sheet_id": id })),
    )
    .await;
    assert!(body["conflicts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_available_pallets_excludes_bound() {
    let (_, app) = setup().await;
    create(&app, &["P-001"]).await;

    let (status, body) = send(&app, "GET", "/api/pallets/available", None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 3);
    assert!(!ids.contains(&"P-001"));
}

#[tokio::test]
async fn test_manifest_json_and_csv() {
    let (_, app) = setup().await;
    let id = create(&app, &["P-001", "P-002"]).await;

    let (status, body) =
        send(&app, "GET", &format!("/api/loading-sheets/{id}/manifest"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sheet_id"], id.as_str());
    assert_eq!(body["totals"]["lines"], 2);
    assert_eq!(body["totals"]["quantity"], 80);
    assert_eq!(body["totals"]["weight_kg"], 320.0);

    let (status, headers, bytes) = send_raw(
        &app,
        "GET",
        &format!("/api/loading-sheets/{id}/manifest?format=csv"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/csv")
    );
    assert!(
        headers[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(&id)
    );
    let text = String::from_utf8(bytes).unwrap();
    assert!(!text.contains("\"\""));
    assert!(text.contains("\n\nNo.,Variety,Box type,Quantity,Weight (kg)\n"));
    assert!(text.contains("Container,MSKU7781000"));
    assert!(text.contains("TOTAL,2 lines,,80,320.00"));
    assert!(text.contains("Loaded by,Ana"));

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/loading-sheets/{id}/manifest?format=pdf"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_store_lock_timeout_is_503_retryable() {
    let app = locked_app();

    let (status, body) = send(
        &app,
        "POST",
        "/api/loading-sheets",
        Some(sheet_body(&["P-001"])),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "infrastructure");
    assert_eq!(body["retryable"], true);
    assert!(body.get("conflicts").is_none());
    assert!(!body["message"].as_str().unwrap().contains("lock timeout"));

    let (status, body) = send(&app, "GET", "/api/loading-sheets", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["retryable"], true);
}

#[tokio::test]
async fn test_box_quantity_overflow_is_400() {
    let (store, app) = setup().await;
    let mut body = sheet_body(&[]);
    body["pallets"] = json!([{
        "pallet_id": "P-001",
        "boxes": [{ "quantity": i32::MAX }, { "quantity": 1 }],
    }]);

    let (status, err) = send(&app, "POST", "/api/loading-sheets", Some(body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(err["kind"], "validation");
    assert!(err["message"].as_str().unwrap().contains("quantity"));
    assert_eq!(store.sheet_count().await, 0);
}

#[tokio::test]
async fn test_huge_page_number_returns_empty_page() {
    let (_, app) = setup().await;
    create(&app, &["P-001"]).await;

    let (status, body) = send(
        &app,
        "GET",
        &format!("/api/loading-sheets?page={}", u64::MAX),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert!(body["items"].as_array().unwrap().is_empty());
}
