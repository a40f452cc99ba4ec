use crate::error::{AllocationError, Result};
use crate::ids::{CarrierId, PalletId, SheetId};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Scalar fields of a loading sheet, as submitted by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetFields {
    pub exporter: String,
    pub client: Option<String>,
    pub shipping_line: Option<String>,
    pub bill_number: String,
    pub container: String,
    pub line_seal: Option<String>,
    pub exporter_seal: Option<String>,
    pub truck: Option<String>,
    pub vessel: Option<String>,
    pub temp_setpoint: Option<String>,
    pub temp_recorded: Option<String>,
    pub loading_date: NaiveDate,
    pub loaded_by: Option<String>,
    pub checked_by: Option<String>,
    pub remarks: Option<String>,
}

impl SheetFields {
    /// Minimal field set; optional fields start empty.
    pub fn new(
        exporter: impl Into<String>,
        bill_number: impl Into<String>,
        container: impl Into<String>,
        loading_date: NaiveDate,
    ) -> Self {
        Self {
            exporter: exporter.into(),
            client: None,
            shipping_line: None,
            bill_number: bill_number.into(),
            container: container.into(),
            line_seal: None,
            exporter_seal: None,
            truck: None,
            vessel: None,
            temp_setpoint: None,
            temp_recorded: None,
            loading_date,
            loaded_by: None,
            checked_by: None,
            remarks: None,
        }
    }

    /// Trims every field, turns blank optionals into `None` and checks the
    /// required ones.
    pub fn normalized(self) -> Result<Self> {
        let fields = Self {
            exporter: self.exporter.trim().to_string(),
            client: clean(self.client),
            shipping_line: clean(self.shipping_line),
            bill_number: self.bill_number.trim().to_string(),
            container: self.container.trim().to_string(),
            line_seal: clean(self.line_seal),
            exporter_seal: clean(self.exporter_seal),
            truck: clean(self.truck),
            vessel: clean(self.vessel),
            temp_setpoint: clean(self.temp_setpoint),
            temp_recorded: clean(self.temp_recorded),
            loading_date: self.loading_date,
            loaded_by: clean(self.loaded_by),
            checked_by: clean(self.checked_by),
            remarks: clean(self.remarks),
        };

        if fields.exporter.is_empty() {
            return Err(AllocationError::MissingField("exporter"));
        }
        if fields.bill_number.is_empty() {
            return Err(AllocationError::MissingField("bill_number"));
        }
        if fields.container.is_empty() {
            return Err(AllocationError::MissingField("container"));
        }

        Ok(fields)
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Snapshot of one pallet's outbound data, taken when it was assigned.
///
/// Owned by its sheet and never updated in place: edits to the source
/// pallet do not flow back into a manifest that was already written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadingLineItem {
    pub sequence: u32,
    pub pallet_id: Option<PalletId>,
    pub variety: String,
    pub box_type: String,
    pub quantity: i32,
}

/// An outbound shipment manifest with its ordered line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingSheet {
    pub id: SheetId,
    #[serde(flatten)]
    pub fields: SheetFields,
    pub assigned_carrier: Option<CarrierId>,
    pub line_items: Vec<LoadingLineItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoadingSheet {
    pub fn new(id: SheetId, fields: SheetFields, line_items: Vec<LoadingLineItem>) -> Self {
        let now = Utc::now();
        let mut sheet = Self {
            id,
            fields,
            assigned_carrier: None,
            line_items,
            created_at: now,
            updated_at: now,
        };
        sheet.sort_line_items();
        sheet
    }

    pub fn sort_line_items(&mut self) {
        self.line_items.sort_by_key(|item| item.sequence);
    }

    /// Pallets referenced by this sheet's line items, in sequence order.
    pub fn pallet_ids(&self) -> Vec<PalletId> {
        self.line_items
            .iter()
            .filter_map(|item| item.pallet_id.clone())
            .collect()
    }

    pub fn total_quantity(&self) -> i64 {
        self.line_items.iter().map(|item| item.quantity as i64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    #[test]
    fn test_normalized_trims_and_clears_blanks() {
        let mut fields = SheetFields::new("  Exporter SA ", "BL-1", "MSKU123", date());
        fields.client = Some("   ".to_string());
        fields.remarks = Some(" fragile ".to_string());

        let fields = fields.normalized().unwrap();
        assert_eq!(fields.exporter, "Exporter SA");
        assert_eq!(fields.client, None);
        assert_eq!(fields.remarks.as_deref(), Some("fragile"));
    }

    #[test]
    fn test_required_fields() {
        let err = SheetFields::new("", "BL", "C", date()).normalized().unwrap_err();
        assert_eq!(err, AllocationError::MissingField("exporter"));

        let err = SheetFields::new("E", " ", "C", date()).normalized().unwrap_err();
        assert_eq!(err, AllocationError::MissingField("bill_number"));

        let err = SheetFields::new("E", "BL", "", date()).normalized().unwrap_err();
        assert_eq!(err, AllocationError::MissingField("container"));
    }

    #[test]
    fn test_line_items_sorted_on_construction() {
        let item = |sequence: u32, pallet: &str| LoadingLineItem {
            sequence,
            pallet_id: Some(PalletId::new(pallet).unwrap()),
            variety: "Hass".to_string(),
            box_type: "4kg".to_string(),
            quantity: 10,
        };
        let sheet = LoadingSheet::new(
            SheetId::new("LS1").unwrap(),
            SheetFields::new("E", "BL", "C", date()),
            vec![item(2, "p2"), item(1, "p1")],
        );

        assert_eq!(sheet.line_items[0].sequence, 1);
        assert_eq!(
            sheet.pallet_ids(),
            vec![PalletId::new("p1").unwrap(), PalletId::new("p2").unwrap()]
        );
        assert_eq!(sheet.total_quantity(), 20);
    }
}
