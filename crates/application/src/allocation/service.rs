use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use domain::assignment::{build_line_items, validate_assignments};
use domain::{
    AllocationError, AllocationStore, AllocationTx, CarrierId, ColdRoomPallet, LoadingSheet,
    PageRequest, PalletAssignment, PalletConflict, PalletId, SheetFields, SheetFilter, SheetId,
    SheetIdGenerator, SheetPage,
};
use tracing::{debug, info, warn};

use super::validator;

/// Tuning knobs for [`AllocationService`].
#[derive(Debug, Clone)]
pub struct AllocationSettings {
    /// How many fresh ids a create may try before giving up on collisions.
    pub id_attempts: u32,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self { id_attempts: 3 }
    }
}

/// Use cases that create, revise and release pallet allocations.
///
/// Each write runs validation and every statement it guards inside one
/// store transaction. An early return drops the transaction, which discards
/// everything written so far.
pub struct AllocationService<S: AllocationStore> {
    store: Arc<S>,
    ids: Arc<dyn SheetIdGenerator>,
    settings: AllocationSettings,
}

impl<S: AllocationStore> Clone for AllocationService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            ids: self.ids.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<S: AllocationStore> AllocationService<S> {
    pub fn new(
        store: Arc<S>,
        ids: Arc<dyn SheetIdGenerator>,
        settings: AllocationSettings,
    ) -> Self {
        Self {
            store,
            ids,
            settings,
        }
    }

    /// Read-only conflict check. Nothing is written and the locks taken are
    /// released straight away.
    pub async fn check_conflicts(
        &self,
        candidates: &[PalletId],
        exclude: Option<&SheetId>,
    ) -> Result<Vec<PalletConflict>, AllocationError> {
        let mut tx = self.store.begin().await?;
        let outcome = validator::validate(&mut tx, candidates, exclude).await?;
        tx.rollback().await?;
        Ok(outcome.conflicts)
    }

    pub async fn create(
        &self,
        fields: SheetFields,
        assignments: Vec<PalletAssignment>,
    ) -> Result<LoadingSheet, AllocationError> {
        let fields = fields.normalized()?;
        let pallet_ids = validate_assignments(&assignments)?;

        let attempts = self.settings.id_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.try_create(&fields, &assignments, &pallet_ids).await {
                Err(AllocationError::IdCollision(id)) if attempt < attempts => {
                    warn!(sheet_id = %id, attempt, "Sheet id collision, retrying with a fresh id");
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    async fn try_create(
        &self,
        fields: &SheetFields,
        assignments: &[PalletAssignment],
        pallet_ids: &[PalletId],
    ) -> Result<LoadingSheet, AllocationError> {
        let mut tx = self.store.begin().await?;

        let registry = validator::validate(&mut tx, pallet_ids, None)
            .await?
            .into_bindable()?;

        let sheet_id = self.ids.next_id()?;
        let items = build_line_items(assignments, &registry)?;
        let sheet = LoadingSheet::new(sheet_id.clone(), fields.clone(), items);

        tx.insert_sheet(&sheet).await?;
        tx.insert_line_items(&sheet_id, &sheet.line_items).await?;
        let bound = tx.bind_pallets(pallet_ids, &sheet_id, Utc::now()).await?;

        let created = reread(&mut tx, &sheet_id).await?;
        tx.commit().await?;

        info!(
            sheet_id = %sheet_id,
            line_items = created.line_items.len(),
            pallets_bound = bound,
            "Loading sheet created"
        );
        Ok(created)
    }

    /// Replace the scalar fields of a sheet and, when `assignments` is given,
    /// reconcile its pallet bindings against the new list.
    ///
    /// Reconciliation releases every pallet the sheet held and then binds the
    /// full new list, rewriting all line items from the submission.
    pub async fn update(
        &self,
        id: &SheetId,
        fields: SheetFields,
        assignments: Option<Vec<PalletAssignment>>,
    ) -> Result<LoadingSheet, AllocationError> {
        let fields = fields.normalized()?;
        let new_ids = match &assignments {
            Some(list) => Some(validate_assignments(list)?),
            None => None,
        };

        let mut tx = self.store.begin().await?;
        let mut sheet = tx
            .sheet_for_update(id)
            .await?
            .ok_or_else(|| AllocationError::SheetNotFound(id.to_string()))?;
        let now = Utc::now();

        if let (Some(assignments), Some(new_ids)) = (&assignments, &new_ids) {
            let current: HashSet<PalletId> = sheet.pallet_ids().into_iter().collect();
            let to_bind: Vec<&PalletId> = new_ids.iter().filter(|p| !current.contains(*p)).collect();
            let retained: HashSet<&PalletId> = new_ids.iter().collect();
            let to_release = current.iter().filter(|p| !retained.contains(p)).count();

            // Pallets that stay on the sheet are validated too: they pass when
            // the sheet owns them and are caught if anything else does.
            let registry = validator::validate(&mut tx, new_ids, Some(id))
                .await?
                .into_bindable()?;

            tx.delete_line_items(id).await?;
            let released = tx.release_pallets(id, now).await?;

            let items = build_line_items(assignments, &registry)?;
            tx.insert_line_items(id, &items).await?;
            let bound = tx.bind_pallets(new_ids, id, now).await?;

            info!(
                sheet_id = %id,
                newly_bound = to_bind.len(),
                dropped = to_release,
                released,
                bound,
                "Loading sheet pallets reconciled"
            );
            sheet.line_items = items;
        }

        sheet.fields = fields;
        sheet.updated_at = now;
        tx.update_sheet(&sheet).await?;

        let updated = reread(&mut tx, id).await?;
        tx.commit().await?;

        debug!(sheet_id = %id, "Loading sheet updated");
        Ok(updated)
    }

    /// Release every pallet held by the sheet, then remove the sheet and its
    /// line items. Returns the sheet as it was before deletion.
    pub async fn delete(&self, id: &SheetId) -> Result<LoadingSheet, AllocationError> {
        let mut tx = self.store.begin().await?;
        let sheet = tx
            .sheet_for_update(id)
            .await?
            .ok_or_else(|| AllocationError::SheetNotFound(id.to_string()))?;

        let released = tx.release_pallets(id, Utc::now()).await?;
        tx.delete_line_items(id).await?;
        tx.delete_sheet(id).await?;
        tx.commit().await?;

        info!(sheet_id = %id, released, "Loading sheet deleted");
        Ok(sheet)
    }

    /// Set or clear (`None`) the carrier responsible for a sheet.
    pub async fn assign_carrier(
        &self,
        id: &SheetId,
        carrier: Option<CarrierId>,
    ) -> Result<LoadingSheet, AllocationError> {
        let mut tx = self.store.begin().await?;
        let mut sheet = tx
            .sheet_for_update(id)
            .await?
            .ok_or_else(|| AllocationError::SheetNotFound(id.to_string()))?;

        if let Some(carrier_id) = &carrier {
            if tx.find_carrier(carrier_id).await?.is_none() {
                return Err(AllocationError::CarrierNotFound(carrier_id.to_string()));
            }
        }

        if sheet.assigned_carrier == carrier {
            tx.rollback().await?;
            return Ok(sheet);
        }

        sheet.assigned_carrier = carrier;
        sheet.updated_at = Utc::now();
        tx.update_sheet(&sheet).await?;
        tx.commit().await?;

        info!(
            sheet_id = %id,
            carrier = sheet.assigned_carrier.as_ref().map(|c| c.as_str()).unwrap_or(""),
            "Carrier assignment changed"
        );
        Ok(sheet)
    }

    pub async fn get(&self, id: &SheetId) -> Result<LoadingSheet, AllocationError> {
        self.store
            .find_sheet(id)
            .await?
            .ok_or_else(|| AllocationError::SheetNotFound(id.to_string()))
    }

    pub async fn list(
        &self,
        filter: &SheetFilter,
        page: PageRequest,
    ) -> Result<SheetPage, AllocationError> {
        self.store.list_sheets(filter, page).await
    }

    pub async fn available_pallets(&self) -> Result<Vec<ColdRoomPallet>, AllocationError> {
        self.store.available_pallets().await
    }
}

async fn reread<T: AllocationTx>(tx: &mut T, id: &SheetId) -> Result<LoadingSheet, AllocationError> {
    tx.sheet_for_update(id)
        .await?
        .ok_or_else(|| AllocationError::Storage(format!("sheet {id} vanished inside its own transaction")))
}
