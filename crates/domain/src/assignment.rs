use crate::error::{AllocationError, Result};
use crate::ids::PalletId;
use crate::pallet::ColdRoomPallet;
use crate::sheet::LoadingLineItem;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Per-box quantity nested inside an assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxQuantity {
    #[serde(default)]
    pub box_type: Option<String>,
    #[serde(default)]
    pub quantity: i32,
}

/// One row of a submitted pallet list.
///
/// A row without `pallet_id` is a manual line item: it is written to the
/// sheet but binds nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalletAssignment {
    #[serde(default)]
    pub pallet_id: Option<PalletId>,
    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default)]
    pub box_type: Option<String>,
    #[serde(default)]
    pub quantity: Option<i32>,
    #[serde(default)]
    pub total_quantity: Option<i32>,
    #[serde(default)]
    pub boxes: Vec<BoxQuantity>,
}

impl PalletAssignment {
    pub fn for_pallet(pallet_id: PalletId) -> Self {
        Self {
            pallet_id: Some(pallet_id),
            ..Default::default()
        }
    }

    pub fn with_quantity(mut self, quantity: i32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    /// Outbound quantity: explicit quantity, else the declared total, else
    /// the sum of the nested box quantities. The first non-zero source wins.
    ///
    /// A box sum that does not fit a quantity column is rejected.
    pub fn outbound_quantity(&self) -> Result<i32> {
        let explicit = self.quantity.unwrap_or(0);
        if explicit != 0 {
            return Ok(explicit);
        }
        let declared = self.total_quantity.unwrap_or(0);
        if declared != 0 {
            return Ok(declared);
        }

        let sum = self
            .boxes
            .iter()
            .try_fold(0i64, |acc, b| acc.checked_add(i64::from(b.quantity)));
        sum.and_then(|total| i32::try_from(total).ok())
            .ok_or_else(|| AllocationError::InvalidField {
                field: "quantity",
                reason: "sum of box quantities is out of range".to_string(),
            })
    }
}

/// Checks the shape of a submitted list and returns its pallet ids in
/// submission order.
pub fn validate_assignments(assignments: &[PalletAssignment]) -> Result<Vec<PalletId>> {
    if assignments.is_empty() {
        return Err(AllocationError::NoPallets);
    }

    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for assignment in assignments {
        if let Some(id) = &assignment.pallet_id {
            if !seen.insert(id.clone()) {
                return Err(AllocationError::DuplicatePallet(id.to_string()));
            }
            ids.push(id.clone());
        }
        if assignment.outbound_quantity()? < 0 {
            return Err(AllocationError::InvalidField {
                field: "quantity",
                reason: "must not be negative".to_string(),
            });
        }
    }
    Ok(ids)
}

/// Builds the line-item snapshot for a submitted list.
///
/// Sequence numbers follow submission order starting at 1. Variety and box
/// type come from the submission, falling back to the registry pallet.
pub fn build_line_items(
    assignments: &[PalletAssignment],
    registry: &[ColdRoomPallet],
) -> Result<Vec<LoadingLineItem>> {
    let by_id: HashMap<&PalletId, &ColdRoomPallet> = registry.iter().map(|p| (&p.id, p)).collect();

    assignments
        .iter()
        .enumerate()
        .map(|(index, assignment)| {
            let source = assignment.pallet_id.as_ref().and_then(|id| by_id.get(id));
            let pick = |submitted: &Option<String>, live: Option<&String>| {
                submitted
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(str::to_string)
                    .or_else(|| live.cloned())
                    .unwrap_or_default()
            };

            Ok(LoadingLineItem {
                sequence: index as u32 + 1,
                pallet_id: assignment.pallet_id.clone(),
                variety: pick(&assignment.variety, source.map(|p| &p.variety)),
                box_type: pick(&assignment.box_type, source.map(|p| &p.box_type)),
                quantity: assignment.outbound_quantity()?,
            })
        })
        .collect()
}
