use domain::conflict::find_conflicts;
use domain::{AllocationError, AllocationTx, ColdRoomPallet, PalletConflict, PalletId, SheetId};
use std::collections::HashSet;
use tracing::warn;

/// Result of checking a candidate set against the pallet registry.
#[derive(Debug, Default)]
pub struct ValidationOutcome {
    /// Registry rows for the candidates that exist, locked by the transaction.
    pub pallets: Vec<ColdRoomPallet>,
    pub conflicts: Vec<PalletConflict>,
    pub unknown: Vec<PalletId>,
}

impl ValidationOutcome {
    /// Turns the outcome into an error when anything blocks binding.
    pub fn into_bindable(self) -> Result<Vec<ColdRoomPallet>, AllocationError> {
        if !self.unknown.is_empty() {
            return Err(AllocationError::PalletsNotFound(
                self.unknown.iter().map(|id| id.to_string()).collect(),
            ));
        }
        if !self.conflicts.is_empty() {
            return Err(AllocationError::PalletConflict(self.conflicts));
        }
        Ok(self.pallets)
    }
}

/// Reads and locks `candidates`, then reports which are bound to a sheet
/// other than `exclude` and which do not exist.
///
/// Must run inside the same transaction as the writes it guards.
pub async fn validate<T: AllocationTx>(
    tx: &mut T,
    candidates: &[PalletId],
    exclude: Option<&SheetId>,
) -> Result<ValidationOutcome, AllocationError> {
    if candidates.is_empty() {
        return Ok(ValidationOutcome::default());
    }

    // Lock in a stable order so two writers touching the same pallets queue
    // instead of deadlocking.
    let mut ordered = candidates.to_vec();
    ordered.sort();
    ordered.dedup();

    let pallets = tx.pallets_for_update(&ordered).await?;
    let found: HashSet<&PalletId> = pallets.iter().map(|p| &p.id).collect();
    let unknown: Vec<PalletId> = ordered
        .iter()
        .filter(|id| !found.contains(id))
        .cloned()
        .collect();
    let conflicts = find_conflicts(&pallets, exclude);

    if !conflicts.is_empty() {
        warn!(
            conflicts = conflicts.len(),
            exclude = exclude.map(|s| s.as_str()).unwrap_or(""),
            "Pallet allocation conflict"
        );
    }

    Ok(ValidationOutcome {
        pallets,
        conflicts,
        unknown,
    })
}
