//! Wire shapes for the HTTP API.
//!
//! Outbound views render every absent optional as an empty string.

use chrono::{DateTime, NaiveDate, Utc};
use domain::{
    AllocationError, CarrierFilter, CarrierId, ColdRoomPallet, LoadingLineItem, LoadingSheet,
    PalletAssignment, PalletConflict, PalletId, SheetFields, SheetFilter, SheetId, SheetPage,
};
use serde::{Deserialize, Serialize};

fn or_empty(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, AllocationError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| AllocationError::InvalidField {
            field,
            reason: format!("{raw:?} is not a date (expected YYYY-MM-DD)"),
        })
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SheetRequest {
    #[serde(default)]
    pub exporter: Option<String>,
    #[serde(default)]
    pub client: Option<String>,
    #[serde(default)]
    pub shipping_line: Option<String>,
    #[serde(default)]
    pub bill_number: Option<String>,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub line_seal: Option<String>,
    #[serde(default)]
    pub exporter_seal: Option<String>,
    #[serde(default)]
    pub truck: Option<String>,
    #[serde(default)]
    pub vessel: Option<String>,
    #[serde(default)]
    pub temp_setpoint: Option<String>,
    #[serde(default)]
    pub temp_recorded: Option<String>,
    #[serde(default)]
    pub loading_date: Option<String>,
    #[serde(default)]
    pub loaded_by: Option<String>,
    #[serde(default)]
    pub checked_by: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    /// Absent on update means "keep the current pallets".
    #[serde(default)]
    pub pallets: Option<Vec<PalletAssignment>>,
}

impl SheetRequest {
    pub fn into_parts(
        self,
    ) -> Result<(SheetFields, Option<Vec<PalletAssignment>>), AllocationError> {
        let raw_date = self
            .loading_date
            .filter(|d| !d.trim().is_empty())
            .ok_or(AllocationError::MissingField("loading_date"))?;
        let loading_date = parse_date("loading_date", &raw_date)?;

        let fields = SheetFields {
            exporter: self.exporter.unwrap_or_default(),
            client: self.client,
            shipping_line: self.shipping_line,
            bill_number: self.bill_number.unwrap_or_default(),
            container: self.container.unwrap_or_default(),
            line_seal: self.line_seal,
            exporter_seal: self.exporter_seal,
            truck: self.truck,
            vessel: self.vessel,
            temp_setpoint: self.temp_setpoint,
            temp_recorded: self.temp_recorded,
            loading_date,
            loaded_by: self.loaded_by,
            checked_by: self.checked_by,
            remarks: self.remarks,
        };
        Ok((fields, self.pallets))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CarrierRequest {
    /// `null` or absent clears the assignment.
    #[serde(default)]
    pub carrier_id: Option<CarrierId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConflictCheckRequest {
    pub pallet_ids: Vec<PalletId>,
    #[serde(default)]
    pub exclude_sheet_id: Option<SheetId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheckResponse {
    pub conflicts: Vec<PalletConflict>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub client: Option<String>,
    pub container: Option<String>,
    pub bill_number: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    /// `assigned`, `unassigned` or `any`.
    pub carrier: Option<String>,
    pub page: Option<u64>,
    pub page_size: Option<u64>,
}

impl ListQuery {
    pub fn filter(&self) -> Result<SheetFilter, AllocationError> {
        let date = |field, raw: &Option<String>| {
            raw.as_deref()
                .filter(|s| !s.trim().is_empty())
                .map(|s| parse_date(field, s))
                .transpose()
        };
        let carrier = match self.carrier.as_deref().map(str::trim) {
            None | Some("") | Some("any") => CarrierFilter::Any,
            Some("assigned") => CarrierFilter::Assigned,
            Some("unassigned") => CarrierFilter::Unassigned,
            Some(other) => {
                return Err(AllocationError::InvalidField {
                    field: "carrier",
                    reason: format!("{other:?} is not one of assigned, unassigned, any"),
                });
            }
        };

        Ok(SheetFilter {
            client: self.client.clone(),
            container: self.container.clone(),
            bill_number: self.bill_number.clone(),
            loading_from: date("from", &self.from)?,
            loading_to: date("to", &self.to)?,
            carrier,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestQuery {
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemView {
    pub sequence: u32,
    pub pallet_id: String,
    pub variety: String,
    pub box_type: String,
    pub quantity: i32,
}

impl From<&LoadingLineItem> for LineItemView {
    fn from(item: &LoadingLineItem) -> Self {
        Self {
            sequence: item.sequence,
            pallet_id: item
                .pallet_id
                .as_ref()
                .map(|p| p.to_string())
                .unwrap_or_default(),
            variety: item.variety.clone(),
            box_type: item.box_type.clone(),
            quantity: item.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetView {
    pub id: String,
    pub exporter: String,
    pub client: String,
    pub shipping_line: String,
    pub bill_number: String,
    pub container: String,
    pub line_seal: String,
    pub exporter_seal: String,
    pub truck: String,
    pub vessel: String,
    pub temp_setpoint: String,
    pub temp_recorded: String,
    pub loading_date: String,
    pub loaded_by: String,
    pub checked_by: String,
    pub remarks: String,
    pub assigned_carrier: String,
    pub line_items: Vec<LineItemView>,
    pub total_quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&LoadingSheet> for SheetView {
    fn from(sheet: &LoadingSheet) -> Self {
        let f = &sheet.fields;
        let mut line_items: Vec<LineItemView> = sheet.line_items.iter().map(Into::into).collect();
        line_items.sort_by_key(|item| item.sequence);

        Self {
            id: sheet.id.to_string(),
            exporter: f.exporter.clone(),
            client: or_empty(&f.client),
            shipping_line: or_empty(&f.shipping_line),
            bill_number: f.bill_number.clone(),
            container: f.container.clone(),
            line_seal: or_empty(&f.line_seal),
            exporter_seal: or_empty(&f.exporter_seal),
            truck: or_empty(&f.truck),
            vessel: or_empty(&f.vessel),
            temp_setpoint: or_empty(&f.temp_setpoint),
            temp_recorded: or_empty(&f.temp_recorded),
            loading_date: f.loading_date.format("%Y-%m-%d").to_string(),
            loaded_by: or_empty(&f.loaded_by),
            checked_by: or_empty(&f.checked_by),
            remarks: or_empty(&f.remarks),
            assigned_carrier: sheet
                .assigned_carrier
                .as_ref()
                .map(|c| c.to_string())
                .unwrap_or_default(),
            total_quantity: sheet.total_quantity(),
            line_items,
            created_at: sheet.created_at,
            updated_at: sheet.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetPageView {
    pub items: Vec<SheetView>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

impl From<&SheetPage> for SheetPageView {
    fn from(page: &SheetPage) -> Self {
        Self {
            items: page.items.iter().map(Into::into).collect(),
            total: page.total,
            page: page.page,
            page_size: page.page_size,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PalletView {
    pub id: String,
    pub display_name: String,
    pub variety: String,
    pub box_type: String,
    pub size: String,
    pub grade: String,
    pub quantity: i32,
    pub supplier_ref: String,
    pub region: String,
}

impl From<&ColdRoomPallet> for PalletView {
    fn from(p: &ColdRoomPallet) -> Self {
        Self {
            id: p.id.to_string(),
            display_name: p.display_name.clone(),
            variety: p.variety.clone(),
            box_type: p.box_type.clone(),
            size: or_empty(&p.size),
            grade: or_empty(&p.grade),
            quantity: p.quantity,
            supplier_ref: or_empty(&p.supplier_ref),
            region: or_empty(&p.region),
        }
    }
}
