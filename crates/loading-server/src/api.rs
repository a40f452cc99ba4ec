use axum::{
    Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
};
use application::Manifest;
use domain::{AllocationStore, SheetId};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::dto::{
    CarrierRequest, ConflictCheckRequest, ConflictCheckResponse, ListQuery, ManifestQuery,
    PalletView, SheetPageView, SheetRequest, SheetView,
};
use crate::error::ApiError;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

pub fn create_router<S: AllocationStore + 'static>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/loading-sheets",
            get(list_sheets::<S>).post(create_sheet::<S>),
        )
        .route("/api/loading-sheets/conflicts", post(check_conflicts::<S>))
        .route(
            "/api/loading-sheets/{id}",
            get(get_sheet::<S>)
                .put(update_sheet::<S>)
                .delete(delete_sheet::<S>),
        )
        .route("/api/loading-sheets/{id}/carrier", put(assign_carrier::<S>))
        .route("/api/loading-sheets/{id}/manifest", get(export_manifest::<S>))
        .route("/api/pallets/available", get(available_pallets::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn sheet_id(raw: String) -> ApiResult<SheetId> {
    Ok(SheetId::new(raw)?)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

async fn create_sheet<S: AllocationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<SheetRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<SheetView>)> {
    let Json(request) = payload?;
    let (fields, pallets) = request.into_parts()?;
    let sheet = state
        .allocation
        .create(fields, pallets.unwrap_or_default())
        .await?;
    Ok((StatusCode::CREATED, Json(SheetView::from(&sheet))))
}

async fn get_sheet<S: AllocationStore + 'static>(
    Path(id): Path<String>,
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<Json<SheetView>> {
    let sheet = state.allocation.get(&sheet_id(id)?).await?;
    Ok(Json(SheetView::from(&sheet)))
}

async fn update_sheet<S: AllocationStore + 'static>(
    Path(id): Path<String>,
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<SheetRequest>, JsonRejection>,
) -> ApiResult<Json<SheetView>> {
    let id = sheet_id(id)?;
    let Json(request) = payload?;
    let (fields, pallets) = request.into_parts()?;
    let sheet = state.allocation.update(&id, fields, pallets).await?;
    Ok(Json(SheetView::from(&sheet)))
}

async fn delete_sheet<S: AllocationStore + 'static>(
    Path(id): Path<String>,
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<Json<SheetView>> {
    let sheet = state.allocation.delete(&sheet_id(id)?).await?;
    Ok(Json(SheetView::from(&sheet)))
}

async fn assign_carrier<S: AllocationStore + 'static>(
    Path(id): Path<String>,
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<CarrierRequest>, JsonRejection>,
) -> ApiResult<Json<SheetView>> {
    let id = sheet_id(id)?;
    let Json(request) = payload?;
    let sheet = state
        .allocation
        .assign_carrier(&id, request.carrier_id)
        .await?;
    Ok(Json(SheetView::from(&sheet)))
}

async fn list_sheets<S: AllocationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<SheetPageView>> {
    let Query(query) = query?;
    let filter = query.filter()?;
    let page = state.page_request(query.page, query.page_size);
    let result = state.allocation.list(&filter, page).await?;
    Ok(Json(SheetPageView::from(&result)))
}

async fn check_conflicts<S: AllocationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    payload: Result<Json<ConflictCheckRequest>, JsonRejection>,
) -> ApiResult<Json<ConflictCheckResponse>> {
    let Json(request) = payload?;
    let conflicts = state
        .allocation
        .check_conflicts(&request.pallet_ids, request.exclude_sheet_id.as_ref())
        .await?;
    Ok(Json(ConflictCheckResponse { conflicts }))
}

async fn available_pallets<S: AllocationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> ApiResult<Json<Vec<PalletView>>> {
    let pallets = state.allocation.available_pallets().await?;
    Ok(Json(pallets.iter().map(PalletView::from).collect()))
}

async fn export_manifest<S: AllocationStore + 'static>(
    Path(id): Path<String>,
    State(state): State<Arc<AppState<S>>>,
    query: Result<Query<ManifestQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let sheet = state.allocation.get(&sheet_id(id)?).await?;
    let manifest = Manifest::for_sheet(&sheet, &state.box_weights);

    match query.format.as_deref().map(str::trim) {
        None | Some("") | Some("json") => Ok(Json(manifest).into_response()),
        Some("csv") => {
            let body = manifest_csv(&manifest)?;
            info!(sheet_id = %sheet.id, bytes = body.len(), "Manifest exported");
            let disposition = format!("attachment; filename=\"{}-manifest.csv\"", sheet.id);
            Ok((
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response())
        }
        Some(other) => Err(ApiError::BadRequest(format!(
            "Unsupported manifest format {other:?}, use json or csv"
        ))),
    }
}

/// Sections of the manifest are separated by one empty line.
fn manifest_csv(manifest: &Manifest) -> ApiResult<Vec<u8>> {
    let records = manifest.to_records();
    let mut out = Vec::new();
    for (index, section) in records.split(|record| record.is_empty()).enumerate() {
        if index > 0 {
            out.push(b'\n');
        }
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(&mut out);
        for record in section {
            writer
                .write_record(record)
                .map_err(|e| ApiError::Internal(format!("CSV write failed: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| ApiError::Internal(format!("CSV flush failed: {e}")))?;
    }
    Ok(out)
}
