use crate::ids::{PalletId, SheetId};
use crate::pallet::ColdRoomPallet;
use serde::{Deserialize, Serialize};

/// A candidate pallet that is already bound to another loading sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletConflict {
    pub pallet_id: PalletId,
    pub display_name: String,
    pub sheet_id: SheetId,
}

/// Pallets from `candidates` bound to a sheet other than `exclude`.
///
/// An empty result means every candidate is unbound or already owned by
/// `exclude`, so binding them to `exclude` keeps exclusivity. Output is
/// sorted by pallet id.
pub fn find_conflicts(
    candidates: &[ColdRoomPallet],
    exclude: Option<&SheetId>,
) -> Vec<PalletConflict> {
    let mut conflicts: Vec<PalletConflict> = candidates
        .iter()
        .filter(|p| p.is_bound_elsewhere(exclude))
        .filter_map(|p| {
            p.assigned_sheet.as_ref().map(|sheet| PalletConflict {
                pallet_id: p.id.clone(),
                display_name: p.display_name.clone(),
                sheet_id: sheet.clone(),
            })
        })
        .collect();
    conflicts.sort_by(|a, b| a.pallet_id.cmp(&b.pallet_id));
    conflicts
}
