use crate::ids::{PalletId, SheetId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A physical inventory unit held in the cold room.
///
/// Created and edited by the inventory subsystem. The allocation engine only
/// ever touches `assigned_sheet` and `updated_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColdRoomPallet {
    pub id: PalletId,
    pub display_name: String,
    pub variety: String,
    pub box_type: String,
    pub size: Option<String>,
    pub grade: Option<String>,
    pub quantity: i32,
    pub supplier_ref: Option<String>,
    pub region: Option<String>,
    pub assigned_sheet: Option<SheetId>,
    pub updated_at: DateTime<Utc>,
}

impl ColdRoomPallet {
    pub fn new(
        id: PalletId,
        display_name: impl Into<String>,
        variety: impl Into<String>,
        box_type: impl Into<String>,
        quantity: i32,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            variety: variety.into(),
            box_type: box_type.into(),
            size: None,
            grade: None,
            quantity,
            supplier_ref: None,
            region: None,
            assigned_sheet: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.assigned_sheet.is_none()
    }

    /// True when the pallet is bound to a sheet other than `sheet`.
    pub fn is_bound_elsewhere(&self, sheet: Option<&SheetId>) -> bool {
        match (&self.assigned_sheet, sheet) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(current), Some(own)) => current != own,
        }
    }
}
