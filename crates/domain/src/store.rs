use crate::carrier::Carrier;
use crate::error::AllocationError;
use crate::ids::{CarrierId, PalletId, SheetId};
use crate::pallet::ColdRoomPallet;
use crate::query::{PageRequest, SheetFilter, SheetPage};
use crate::sheet::{LoadingLineItem, LoadingSheet};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Transactional store holding pallets, loading sheets and carriers.
///
/// Every write goes through an [`AllocationTx`]. Reads outside a transaction
/// only serve the listing path.
#[async_trait]
pub trait AllocationStore: Send + Sync {
    type Tx: AllocationTx;

    /// Open a unit of work. Dropping it without `commit` discards every write.
    async fn begin(&self) -> Result<Self::Tx, AllocationError>;

    async fn find_sheet(&self, id: &SheetId) -> Result<Option<LoadingSheet>, AllocationError>;

    async fn list_sheets(
        &self,
        filter: &SheetFilter,
        page: PageRequest,
    ) -> Result<SheetPage, AllocationError>;

    /// Pallets with no sheet assignment, ordered by id.
    async fn available_pallets(&self) -> Result<Vec<ColdRoomPallet>, AllocationError>;
}

/// A single all-or-nothing unit of work.
///
/// Row reads that end in `_for_update` lock what they return until the
/// transaction ends, so a check made on them stays true for the writes that
/// follow it.
#[async_trait]
pub trait AllocationTx: Send {
    /// Registry pallets among `ids`, locked. Unknown ids are omitted.
    async fn pallets_for_update(
        &mut self,
        ids: &[PalletId],
    ) -> Result<Vec<ColdRoomPallet>, AllocationError>;

    /// The sheet row, locked, with its line items ordered by sequence.
    async fn sheet_for_update(
        &mut self,
        id: &SheetId,
    ) -> Result<Option<LoadingSheet>, AllocationError>;

    async fn find_carrier(&mut self, id: &CarrierId) -> Result<Option<Carrier>, AllocationError>;

    /// Insert the sheet row only. A duplicate id fails with
    /// [`AllocationError::IdCollision`].
    async fn insert_sheet(&mut self, sheet: &LoadingSheet) -> Result<(), AllocationError>;

    /// Overwrite scalar fields, carrier and `updated_at` of an existing row.
    async fn update_sheet(&mut self, sheet: &LoadingSheet) -> Result<(), AllocationError>;

    async fn delete_sheet(&mut self, id: &SheetId) -> Result<(), AllocationError>;

    async fn insert_line_items(
        &mut self,
        sheet_id: &SheetId,
        items: &[LoadingLineItem],
    ) -> Result<(), AllocationError>;

    async fn delete_line_items(&mut self, sheet_id: &SheetId) -> Result<u64, AllocationError>;

    /// Set `assigned_sheet = sheet_id` on every pallet in `ids`.
    async fn bind_pallets(
        &mut self,
        ids: &[PalletId],
        sheet_id: &SheetId,
        at: DateTime<Utc>,
    ) -> Result<u64, AllocationError>;

    /// Clear `assigned_sheet` on every pallet currently bound to `sheet_id`.
    async fn release_pallets(
        &mut self,
        sheet_id: &SheetId,
        at: DateTime<Utc>,
    ) -> Result<u64, AllocationError>;

    async fn commit(self) -> Result<(), AllocationError>;

    async fn rollback(self) -> Result<(), AllocationError>;
}
