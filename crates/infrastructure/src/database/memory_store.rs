use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::{
    AllocationError, AllocationStore, AllocationTx, Carrier, CarrierFilter, CarrierId,
    ColdRoomPallet, LoadingLineItem, LoadingSheet, PageRequest, PalletId, SheetFilter, SheetId,
    SheetPage,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Table contents. Sheets are kept without line items, which live in their
/// own map the way they live in their own table.
#[derive(Debug, Clone, Default)]
struct Tables {
    pallets: BTreeMap<PalletId, ColdRoomPallet>,
    sheets: BTreeMap<SheetId, LoadingSheet>,
    line_items: BTreeMap<SheetId, Vec<LoadingLineItem>>,
    carriers: BTreeMap<CarrierId, Carrier>,
}

impl Tables {
    fn sheet_with_items(&self, id: &SheetId) -> Option<LoadingSheet> {
        let mut sheet = self.sheets.get(id)?.clone();
        sheet.line_items = self.line_items.get(id).cloned().unwrap_or_default();
        sheet.sort_line_items();
        Some(sheet)
    }

    fn matches(sheet: &LoadingSheet, filter: &SheetFilter) -> bool {
        let contains = |value: Option<&str>, needle: &Option<String>| match needle
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            None => true,
            Some(needle) => value
                .map(|v| v.to_lowercase().contains(&needle.to_lowercase()))
                .unwrap_or(false),
        };
        let f = &sheet.fields;

        contains(f.client.as_deref(), &filter.client)
            && contains(Some(f.container.as_str()), &filter.container)
            && contains(Some(f.bill_number.as_str()), &filter.bill_number)
            && filter.loading_from.is_none_or(|from| f.loading_date >= from)
            && filter.loading_to.is_none_or(|to| f.loading_date <= to)
            && match filter.carrier {
                CarrierFilter::Any => true,
                CarrierFilter::Assigned => sheet.assigned_carrier.is_some(),
                CarrierFilter::Unassigned => sheet.assigned_carrier.is_none(),
            }
    }
}

/// In-process store with the same transactional contract as the database.
///
/// A transaction holds the single store lock from `begin` until it ends, so
/// transactions run one at a time. Writes go to a staged copy that replaces
/// the live tables on commit.
#[derive(Clone, Default)]
pub struct InMemoryAllocationStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryAllocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pallets(pallets: impl IntoIterator<Item = ColdRoomPallet>) -> Self {
        let tables = Tables {
            pallets: pallets.into_iter().map(|p| (p.id.clone(), p)).collect(),
            ..Default::default()
        };
        Self {
            tables: Arc::new(Mutex::new(tables)),
        }
    }

    pub async fn add_pallet(&self, pallet: ColdRoomPallet) {
        self.tables.lock().await.pallets.insert(pallet.id.clone(), pallet);
    }

    pub async fn add_carrier(&self, carrier: Carrier) {
        self.tables
            .lock()
            .await
            .carriers
            .insert(carrier.id.clone(), carrier);
    }

    pub async fn pallet(&self, id: &PalletId) -> Option<ColdRoomPallet> {
        self.tables.lock().await.pallets.get(id).cloned()
    }

    pub async fn sheet_count(&self) -> usize {
        self.tables.lock().await.sheets.len()
    }

    /// Describes every place where pallet bindings and line items disagree.
    /// Empty when the store is consistent.
    pub async fn inconsistencies(&self) -> Vec<String> {
        let tables = self.tables.lock().await;
        let mut problems = Vec::new();
        let mut seen = HashSet::new();

        for (sheet_id, items) in &tables.line_items {
            for pallet_id in items.iter().filter_map(|i| i.pallet_id.as_ref()) {
                if !seen.insert(pallet_id.clone()) {
                    problems.push(format!("pallet {pallet_id} appears on several line items"));
                }
                match tables.pallets.get(pallet_id) {
                    Some(p) if p.assigned_sheet.as_ref() == Some(sheet_id) => {}
                    _ => problems.push(format!(
                        "pallet {pallet_id} listed on {sheet_id} but not bound to it"
                    )),
                }
            }
        }

        for pallet in tables.pallets.values() {
            let Some(sheet_id) = &pallet.assigned_sheet else {
                continue;
            };
            if !tables.sheets.contains_key(sheet_id) {
                problems.push(format!("pallet {} bound to missing sheet {sheet_id}", pallet.id));
            } else if !seen.contains(&pallet.id) {
                problems.push(format!("pallet {} bound to {sheet_id} without a line item", pallet.id));
            }
        }
        problems
    }
}

pub struct InMemoryAllocationTx {
    live: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl AllocationStore for InMemoryAllocationStore {
    type Tx = InMemoryAllocationTx;

    async fn begin(&self) -> Result<Self::Tx, AllocationError> {
        let live = self.tables.clone().lock_owned().await;
        let staged = live.clone();
        Ok(InMemoryAllocationTx { live, staged })
    }

    async fn find_sheet(&self, id: &SheetId) -> Result<Option<LoadingSheet>, AllocationError> {
        Ok(self.tables.lock().await.sheet_with_items(id))
    }

    async fn list_sheets(
        &self,
        filter: &SheetFilter,
        page: PageRequest,
    ) -> Result<SheetPage, AllocationError> {
        let tables = self.tables.lock().await;
        let mut matching: Vec<LoadingSheet> = tables
            .sheets
            .keys()
            .filter_map(|id| tables.sheet_with_items(id))
            .filter(|sheet| Tables::matches(sheet, filter))
            .collect();

        matching.sort_by(|a, b| {
            b.fields
                .loading_date
                .cmp(&a.fields.loading_date)
                .then(b.created_at.cmp(&a.created_at))
                .then(a.id.cmp(&b.id))
        });

        let total = matching.len() as u64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size as usize)
            .collect();

        Ok(SheetPage {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
        })
    }

    async fn available_pallets(&self) -> Result<Vec<ColdRoomPallet>, AllocationError> {
        Ok(self
            .tables
            .lock()
            .await
            .pallets
            .values()
            .filter(|p| p.is_available())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AllocationTx for InMemoryAllocationTx {
    async fn pallets_for_update(
        &mut self,
        ids: &[PalletId],
    ) -> Result<Vec<ColdRoomPallet>, AllocationError> {
        let mut found: Vec<ColdRoomPallet> = ids
            .iter()
            .filter_map(|id| self.staged.pallets.get(id).cloned())
            .collect();
        found.sort_by(|a, b| a.id.cmp(&b.id));
        found.dedup_by(|a, b| a.id == b.id);
        Ok(found)
    }

    async fn sheet_for_update(
        &mut self,
        id: &SheetId,
    ) -> Result<Option<LoadingSheet>, AllocationError> {
        Ok(self.staged.sheet_with_items(id))
    }

    async fn find_carrier(&mut self, id: &CarrierId) -> Result<Option<Carrier>, AllocationError> {
        Ok(self.staged.carriers.get(id).cloned())
    }

    async fn insert_sheet(&mut self, sheet: &LoadingSheet) -> Result<(), AllocationError> {
        if self.staged.sheets.contains_key(&sheet.id) {
            return Err(AllocationError::IdCollision(sheet.id.to_string()));
        }
        if let Some(carrier) = &sheet.assigned_carrier {
            if !self.staged.carriers.contains_key(carrier) {
                return Err(AllocationError::Storage(format!("unknown carrier {carrier}")));
            }
        }
        let mut row = sheet.clone();
        row.line_items.clear();
        self.staged.sheets.insert(row.id.clone(), row);
        Ok(())
    }

    async fn update_sheet(&mut self, sheet: &LoadingSheet) -> Result<(), AllocationError> {
        if let Some(carrier) = &sheet.assigned_carrier {
            if !self.staged.carriers.contains_key(carrier) {
                return Err(AllocationError::Storage(format!("unknown carrier {carrier}")));
            }
        }
        let row = self
            .staged
            .sheets
            .get_mut(&sheet.id)
            .ok_or_else(|| AllocationError::Storage(format!("no sheet row {}", sheet.id)))?;
        row.fields = sheet.fields.clone();
        row.assigned_carrier = sheet.assigned_carrier.clone();
        row.updated_at = sheet.updated_at;
        Ok(())
    }

    async fn delete_sheet(&mut self, id: &SheetId) -> Result<(), AllocationError> {
        self.staged.sheets.remove(id);
        // ON DELETE CASCADE / SET NULL
        self.staged.line_items.remove(id);
        for pallet in self.staged.pallets.values_mut() {
            if pallet.assigned_sheet.as_ref() == Some(id) {
                pallet.assigned_sheet = None;
            }
        }
        Ok(())
    }

    async fn insert_line_items(
        &mut self,
        sheet_id: &SheetId,
        items: &[LoadingLineItem],
    ) -> Result<(), AllocationError> {
        if !self.staged.sheets.contains_key(sheet_id) {
            return Err(AllocationError::Storage(format!("no sheet row {sheet_id}")));
        }

        let mut listed: HashSet<PalletId> = self
            .staged
            .line_items
            .values()
            .flatten()
            .filter_map(|i| i.pallet_id.clone())
            .collect();
        let existing = self.staged.line_items.get(sheet_id);
        for item in items {
            if existing.is_some_and(|rows| rows.iter().any(|r| r.sequence == item.sequence)) {
                return Err(AllocationError::Storage(format!(
                    "duplicate line {} on sheet {sheet_id}",
                    item.sequence
                )));
            }
            if let Some(pallet_id) = &item.pallet_id {
                if !listed.insert(pallet_id.clone()) {
                    return Err(AllocationError::Transient(format!(
                        "pallet bound concurrently: {pallet_id}"
                    )));
                }
            }
        }

        self.staged
            .line_items
            .entry(sheet_id.clone())
            .or_default()
            .extend(items.iter().cloned());
        Ok(())
    }

    async fn delete_line_items(&mut self, sheet_id: &SheetId) -> Result<u64, AllocationError> {
        Ok(self
            .staged
            .line_items
            .remove(sheet_id)
            .map(|rows| rows.len() as u64)
            .unwrap_or(0))
    }

    async fn bind_pallets(
        &mut self,
        ids: &[PalletId],
        sheet_id: &SheetId,
        at: DateTime<Utc>,
    ) -> Result<u64, AllocationError> {
        if !self.staged.sheets.contains_key(sheet_id) {
            return Err(AllocationError::Storage(format!("no sheet row {sheet_id}")));
        }
        let mut bound = 0;
        for id in ids {
            if let Some(pallet) = self.staged.pallets.get_mut(id) {
                pallet.assigned_sheet = Some(sheet_id.clone());
                pallet.updated_at = at;
                bound += 1;
            }
        }
        Ok(bound)
    }

    async fn release_pallets(
        &mut self,
        sheet_id: &SheetId,
        at: DateTime<Utc>,
    ) -> Result<u64, AllocationError> {
        let mut released = 0;
        for pallet in self.staged.pallets.values_mut() {
            if pallet.assigned_sheet.as_ref() == Some(sheet_id) {
                pallet.assigned_sheet = None;
                pallet.updated_at = at;
                released += 1;
            }
        }
        Ok(released)
    }

    async fn commit(self) -> Result<(), AllocationError> {
        let Self { mut live, staged } = self;
        *live = staged;
        Ok(())
    }

    async fn rollback(self) -> Result<(), AllocationError> {
        Ok(())
    }
}
