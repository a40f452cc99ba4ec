use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use domain::{
    AllocationError, AllocationStore, AllocationTx, Carrier, CarrierFilter, CarrierId,
    ColdRoomPallet, LoadingLineItem, LoadingSheet, PageRequest, PalletId, SheetFields,
    SheetFilter, SheetId, SheetPage,
};
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
    TransactionTrait,
};
use tracing::debug;

use super::entities::{carriers, cold_room_pallets, loading_line_items, loading_sheets};
use super::errors::{map_db_err, map_line_item_insert_err, map_sheet_insert_err};

/// Allocation store backed by Postgres (production) or SQLite (tests).
///
/// Row locks use `SELECT ... FOR UPDATE`. SQLite has no row locks; a write
/// transaction there serialises on the database file instead.
pub struct SeaOrmAllocationStore {
    db: DatabaseConnection,
    lock_timeout_ms: Option<u64>,
}

impl SeaOrmAllocationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            lock_timeout_ms: None,
        }
    }

    /// Bound how long a transaction waits on a row lock (Postgres only).
    pub fn with_lock_timeout(mut self, lock_timeout_ms: u64) -> Self {
        self.lock_timeout_ms = (lock_timeout_ms > 0).then_some(lock_timeout_ms);
        self
    }
}

pub struct SeaOrmAllocationTx {
    txn: DatabaseTransaction,
}

#[async_trait]
impl AllocationStore for SeaOrmAllocationStore {
    type Tx = SeaOrmAllocationTx;

    async fn begin(&self) -> Result<Self::Tx, AllocationError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        if let (DbBackend::Postgres, Some(ms)) = (txn.get_database_backend(), self.lock_timeout_ms)
        {
            txn.execute_unprepared(&format!("SET LOCAL lock_timeout = '{ms}ms'"))
                .await
                .map_err(map_db_err)?;
        }
        Ok(SeaOrmAllocationTx { txn })
    }

    async fn find_sheet(&self, id: &SheetId) -> Result<Option<LoadingSheet>, AllocationError> {
        load_sheet(&self.db, id, false).await
    }

    async fn list_sheets(
        &self,
        filter: &SheetFilter,
        page: PageRequest,
    ) -> Result<SheetPage, AllocationError> {
        let query = filtered(loading_sheets::Entity::find(), filter)
            .order_by_desc(loading_sheets::Column::LoadingDate)
            .order_by_desc(loading_sheets::Column::CreatedAt)
            .order_by_asc(loading_sheets::Column::Id);

        let paginator = query.paginate(&self.db, page.page_size);
        let total = paginator.num_items().await.map_err(map_db_err)?;
        let models = paginator
            .fetch_page(page.page.saturating_sub(1))
            .await
            .map_err(map_db_err)?;

        let ids: Vec<String> = models.iter().map(|m| m.id.clone()).collect();
        let mut items_by_sheet: HashMap<String, Vec<LoadingLineItem>> = HashMap::new();
        if !ids.is_empty() {
            let rows = loading_line_items::Entity::find()
                .filter(loading_line_items::Column::SheetId.is_in(ids))
                .order_by_asc(loading_line_items::Column::SheetId)
                .order_by_asc(loading_line_items::Column::Sequence)
                .all(&self.db)
                .await
                .map_err(map_db_err)?;
            for row in rows {
                let sheet_id = row.sheet_id.clone();
                items_by_sheet
                    .entry(sheet_id)
                    .or_default()
                    .push(line_item_from_model(row)?);
            }
        }

        let mut items = Vec::with_capacity(models.len());
        for model in models {
            let line_items = items_by_sheet.remove(&model.id).unwrap_or_default();
            items.push(sheet_from_model(model, line_items)?);
        }

        debug!(total, page = page.page, returned = items.len(), "Listed loading sheets");
        Ok(SheetPage {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn available_pallets(&self) -> Result<Vec<ColdRoomPallet>, AllocationError> {
        cold_room_pallets::Entity::find()
            .filter(cold_room_pallets::Column::AssignedSheet.is_null())
            .order_by_asc(cold_room_pallets::Column::Id)
            .all(&self.db)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(pallet_from_model)
            .collect()
    }
}

#[async_trait]
impl AllocationTx for SeaOrmAllocationTx {
    async fn pallets_for_update(
        &mut self,
        ids: &[PalletId],
    ) -> Result<Vec<ColdRoomPallet>, AllocationError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let keys: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let query = cold_room_pallets::Entity::find()
            .filter(cold_room_pallets::Column::Id.is_in(keys))
            .order_by_asc(cold_room_pallets::Column::Id);

        locking(query, self.txn.get_database_backend())
            .all(&self.txn)
            .await
            .map_err(map_db_err)?
            .into_iter()
            .map(pallet_from_model)
            .collect()
    }

    async fn sheet_for_update(
        &mut self,
        id: &SheetId,
    ) -> Result<Option<LoadingSheet>, AllocationError> {
        load_sheet(&self.txn, id, true).await
    }

    async fn find_carrier(&mut self, id: &CarrierId) -> Result<Option<Carrier>, AllocationError> {
        let model = carriers::Entity::find_by_id(id.as_str().to_string())
            .one(&self.txn)
            .await
            .map_err(map_db_err)?;

        match model {
            Some(m) => Ok(Some(Carrier {
                id: stored_id(CarrierId::new(m.id))?,
                name: m.name,
            })),
            None => Ok(None),
        }
    }

    async fn insert_sheet(&mut self, sheet: &LoadingSheet) -> Result<(), AllocationError> {
        let mut model = sheet_active_model(sheet);
        model.created_at = Set(to_offset(sheet.created_at));

        loading_sheets::Entity::insert(model)
            .exec_without_returning(&self.txn)
            .await
            .map_err(|e| map_sheet_insert_err(e, sheet.id.as_str()))?;
        Ok(())
    }

    async fn update_sheet(&mut self, sheet: &LoadingSheet) -> Result<(), AllocationError> {
        sheet_active_model(sheet)
            .update(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn delete_sheet(&mut self, id: &SheetId) -> Result<(), AllocationError> {
        loading_sheets::Entity::delete_by_id(id.as_str().to_string())
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    async fn insert_line_items(
        &mut self,
        sheet_id: &SheetId,
        items: &[LoadingLineItem],
    ) -> Result<(), AllocationError> {
        if items.is_empty() {
            return Ok(());
        }
        let models = items.iter().map(|item| loading_line_items::ActiveModel {
            sheet_id: Set(sheet_id.as_str().to_string()),
            sequence: Set(item.sequence as i32),
            pallet_id: Set(item.pallet_id.as_ref().map(|p| p.as_str().to_string())),
            variety: Set(item.variety.clone()),
            box_type: Set(item.box_type.clone()),
            quantity: Set(item.quantity),
        });

        loading_line_items::Entity::insert_many(models)
            .exec_without_returning(&self.txn)
            .await
            .map_err(map_line_item_insert_err)?;
        Ok(())
    }

    async fn delete_line_items(&mut self, sheet_id: &SheetId) -> Result<u64, AllocationError> {
        let result = loading_line_items::Entity::delete_many()
            .filter(loading_line_items::Column::SheetId.eq(sheet_id.as_str()))
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    async fn bind_pallets(
        &mut self,
        ids: &[PalletId],
        sheet_id: &SheetId,
        at: DateTime<Utc>,
    ) -> Result<u64, AllocationError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let keys: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let result = cold_room_pallets::Entity::update_many()
            .col_expr(
                cold_room_pallets::Column::AssignedSheet,
                Expr::value(sheet_id.as_str()),
            )
            .col_expr(cold_room_pallets::Column::UpdatedAt, Expr::value(to_offset(at)))
            .filter(cold_room_pallets::Column::Id.is_in(keys))
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    async fn release_pallets(
        &mut self,
        sheet_id: &SheetId,
        at: DateTime<Utc>,
    ) -> Result<u64, AllocationError> {
        let result = cold_room_pallets::Entity::update_many()
            .col_expr(
                cold_room_pallets::Column::AssignedSheet,
                Expr::value(Option::<String>::None),
            )
            .col_expr(cold_room_pallets::Column::UpdatedAt, Expr::value(to_offset(at)))
            .filter(cold_room_pallets::Column::AssignedSheet.eq(sheet_id.as_str()))
            .exec(&self.txn)
            .await
            .map_err(map_db_err)?;
        Ok(result.rows_affected)
    }

    async fn commit(self) -> Result<(), AllocationError> {
        self.txn.commit().await.map_err(map_db_err)
    }

    async fn rollback(self) -> Result<(), AllocationError> {
        self.txn.rollback().await.map_err(map_db_err)
    }
}

fn locking<E: EntityTrait>(select: Select<E>, backend: DbBackend) -> Select<E> {
    match backend {
        DbBackend::Sqlite => select,
        _ => select.lock_exclusive(),
    }
}

fn filtered(
    mut query: Select<loading_sheets::Entity>,
    filter: &SheetFilter,
) -> Select<loading_sheets::Entity> {
    let text_filters = [
        (loading_sheets::Column::Client, &filter.client),
        (loading_sheets::Column::Container, &filter.container),
        (loading_sheets::Column::BillNumber, &filter.bill_number),
    ];
    for (column, needle) in text_filters {
        let Some(needle) = needle.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
        query = query.filter(
            Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\')),
        );
    }

    if let Some(from) = filter.loading_from {
        query = query.filter(loading_sheets::Column::LoadingDate.gte(from));
    }
    if let Some(to) = filter.loading_to {
        query = query.filter(loading_sheets::Column::LoadingDate.lte(to));
    }

    match filter.carrier {
        CarrierFilter::Any => query,
        CarrierFilter::Assigned => query.filter(loading_sheets::Column::AssignedCarrier.is_not_null()),
        CarrierFilter::Unassigned => query.filter(loading_sheets::Column::AssignedCarrier.is_null()),
    }
}

/// Makes `%`, `_` and the escape character match literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

async fn load_sheet<C: ConnectionTrait>(
    conn: &C,
    id: &SheetId,
    for_update: bool,
) -> Result<Option<LoadingSheet>, AllocationError> {
    let query = loading_sheets::Entity::find_by_id(id.as_str().to_string());
    let query = if for_update {
        locking(query, conn.get_database_backend())
    } else {
        query
    };
    let Some(model) = query.one(conn).await.map_err(map_db_err)? else {
        return Ok(None);
    };

    let line_items = loading_line_items::Entity::find()
        .filter(loading_line_items::Column::SheetId.eq(id.as_str()))
        .order_by_asc(loading_line_items::Column::Sequence)
        .all(conn)
        .await
        .map_err(map_db_err)?
        .into_iter()
        .map(line_item_from_model)
        .collect::<Result<Vec<_>, _>>()?;

    sheet_from_model(model, line_items).map(Some)
}

fn to_offset(dt: DateTime<Utc>) -> DateTime<FixedOffset> {
    dt.fixed_offset()
}

fn to_utc(dt: DateTime<FixedOffset>) -> DateTime<Utc> {
    dt.with_timezone(&Utc)
}

/// Ids read back from the store are trusted to be well formed; a bad one is
/// a storage fault, not a caller mistake.
fn stored_id<T>(parsed: Result<T, AllocationError>) -> Result<T, AllocationError> {
    parsed.map_err(|e| AllocationError::Storage(format!("corrupt stored id: {e}")))
}

fn pallet_from_model(m: cold_room_pallets::Model) -> Result<ColdRoomPallet, AllocationError> {
    Ok(ColdRoomPallet {
        id: stored_id(PalletId::new(m.id))?,
        display_name: m.display_name,
        variety: m.variety,
        box_type: m.box_type,
        size: m.size,
        grade: m.grade,
        quantity: m.quantity,
        supplier_ref: m.supplier_ref,
        region: m.region,
        assigned_sheet: stored_id(m.assigned_sheet.map(SheetId::new).transpose())?,
        updated_at: to_utc(m.updated_at),
    })
}

fn line_item_from_model(m: loading_line_items::Model) -> Result<LoadingLineItem, AllocationError> {
    let sequence = u32::try_from(m.sequence)
        .map_err(|_| AllocationError::Storage(format!("negative line sequence {}", m.sequence)))?;
    Ok(LoadingLineItem {
        sequence,
        pallet_id: stored_id(m.pallet_id.map(PalletId::new).transpose())?,
        variety: m.variety,
        box_type: m.box_type,
        quantity: m.quantity,
    })
}

fn sheet_from_model(
    m: loading_sheets::Model,
    line_items: Vec<LoadingLineItem>,
) -> Result<LoadingSheet, AllocationError> {
    Ok(LoadingSheet {
        id: stored_id(SheetId::new(m.id))?,
        fields: SheetFields {
            exporter: m.exporter,
            client: m.client,
            shipping_line: m.shipping_line,
            bill_number: m.bill_number,
            container: m.container,
            line_seal: m.line_seal,
            exporter_seal: m.exporter_seal,
            truck: m.truck,
            vessel: m.vessel,
            temp_setpoint: m.temp_setpoint,
            temp_recorded: m.temp_recorded,
            loading_date: m.loading_date,
            loaded_by: m.loaded_by,
            checked_by: m.checked_by,
            remarks: m.remarks,
        },
        assigned_carrier: stored_id(m.assigned_carrier.map(CarrierId::new).transpose())?,
        line_items,
        created_at: to_utc(m.created_at),
        updated_at: to_utc(m.updated_at),
    })
}

/// Every column except `created_at`, which only the insert sets.
fn sheet_active_model(sheet: &LoadingSheet) -> loading_sheets::ActiveModel {
    let f = &sheet.fields;
    loading_sheets::ActiveModel {
        id: Set(sheet.id.as_str().to_string()),
        exporter: Set(f.exporter.clone()),
        client: Set(f.client.clone()),
        shipping_line: Set(f.shipping_line.clone()),
        bill_number: Set(f.bill_number.clone()),
        container: Set(f.container.clone()),
        line_seal: Set(f.line_seal.clone()),
        exporter_seal: Set(f.exporter_seal.clone()),
        truck: Set(f.truck.clone()),
        vessel: Set(f.vessel.clone()),
        temp_setpoint: Set(f.temp_setpoint.clone()),
        temp_recorded: Set(f.temp_recorded.clone()),
        loading_date: Set(f.loading_date),
        loaded_by: Set(f.loaded_by.clone()),
        checked_by: Set(f.checked_by.clone()),
        remarks: Set(f.remarks.clone()),
        assigned_carrier: Set(sheet.assigned_carrier.as_ref().map(|c| c.as_str().to_string())),
        updated_at: Set(to_offset(sheet.updated_at)),
        ..Default::default()
    }
}
