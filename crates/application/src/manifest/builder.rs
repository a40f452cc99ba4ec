use domain::LoadingSheet;
use serde::Serialize;
use std::collections::HashMap;

/// Per-box weights used to compute manifest weights, in kilograms.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxWeights {
    default_kg: f64,
    by_box_type: HashMap<String, f64>,
}

impl BoxWeights {
    pub fn new(default_kg: f64, by_box_type: HashMap<String, f64>) -> Self {
        Self {
            default_kg,
            by_box_type: by_box_type
                .into_iter()
                .map(|(k, v)| (k.trim().to_lowercase(), v))
                .collect(),
        }
    }

    /// Weight of `quantity` boxes of `box_type`. Lookup ignores case.
    pub fn weight_of(&self, box_type: &str, quantity: i32) -> f64 {
        let per_box = self
            .by_box_type
            .get(&box_type.trim().to_lowercase())
            .copied()
            .unwrap_or(self.default_kg);
        per_box * quantity as f64
    }
}

impl Default for BoxWeights {
    fn default() -> Self {
        Self::new(4.0, HashMap::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestRow {
    pub sequence: u32,
    pub variety: String,
    pub box_type: String,
    pub quantity: i32,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestTotals {
    pub lines: usize,
    pub quantity: i64,
    pub weight_kg: f64,
}

/// Flat, printable view of one loading sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Manifest {
    pub sheet_id: String,
    pub header: Vec<ManifestField>,
    pub rows: Vec<ManifestRow>,
    pub totals: ManifestTotals,
    pub signatures: Vec<ManifestField>,
}

pub const COLUMNS: [&str; 5] = ["No.", "Variety", "Box type", "Quantity", "Weight (kg)"];

impl Manifest {
    pub fn for_sheet(sheet: &LoadingSheet, weights: &BoxWeights) -> Self {
        let f = &sheet.fields;
        let mut builder = ManifestBuilder::new(sheet.id.as_str())
            .field("Sheet", sheet.id.as_str())
            .field("Exporter", &f.exporter)
            .field_opt("Client", &f.client)
            .field_opt("Shipping line", &f.shipping_line)
            .field("Bill of lading", &f.bill_number)
            .field("Container", &f.container)
            .field_opt("Line seal", &f.line_seal)
            .field_opt("Exporter seal", &f.exporter_seal)
            .field_opt("Truck", &f.truck)
            .field_opt("Vessel", &f.vessel)
            .field_opt("Temp. setpoint", &f.temp_setpoint)
            .field_opt("Temp. recorded", &f.temp_recorded)
            .field("Loading date", &f.loading_date.format("%Y-%m-%d").to_string())
            .field(
                "Carrier",
                sheet.assigned_carrier.as_ref().map(|c| c.as_str()).unwrap_or(""),
            )
            .field_opt("Remarks", &f.remarks);

        for item in &sheet.line_items {
            builder = builder.row(
                item.sequence,
                &item.variety,
                &item.box_type,
                item.quantity,
                weights.weight_of(&item.box_type, item.quantity),
            );
        }

        builder
            .signature_opt("Loaded by", &f.loaded_by)
            .signature_opt("Checked by", &f.checked_by)
            .build()
    }

    /// Rows of a flat table: header fields, a blank line, the column titles,
    /// one row per line item, the totals row, a blank line and the signature
    /// block.
    pub fn to_records(&self) -> Vec<Vec<String>> {
        let mut records = Vec::new();
        for field in &self.header {
            records.push(vec![field.label.clone(), field.value.clone()]);
        }
        records.push(Vec::new());
        records.push(COLUMNS.iter().map(|c| c.to_string()).collect());
        for row in &self.rows {
            records.push(vec![
                row.sequence.to_string(),
                row.variety.clone(),
                row.box_type.clone(),
                row.quantity.to_string(),
                format!("{:.2}", row.weight_kg),
            ]);
        }
        records.push(vec![
            "TOTAL".to_string(),
            format!("{} lines", self.totals.lines),
            String::new(),
            self.totals.quantity.to_string(),
            format!("{:.2}", self.totals.weight_kg),
        ]);
        records.push(Vec::new());
        for signature in &self.signatures {
            records.push(vec![signature.label.clone(), signature.value.clone()]);
        }
        records
    }
}

pub struct ManifestBuilder {
    sheet_id: String,
    header: Vec<ManifestField>,
    rows: Vec<ManifestRow>,
    signatures: Vec<ManifestField>,
}

impl ManifestBuilder {
    pub fn new(sheet_id: &str) -> Self {
        Self {
            sheet_id: sheet_id.to_string(),
            header: Vec::new(),
            rows: Vec::new(),
            signatures: Vec::new(),
        }
    }

    pub fn field(mut self, label: &str, value: &str) -> Self {
        self.header.push(ManifestField {
            label: label.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Absent values print as an empty string.
    pub fn field_opt(self, label: &str, value: &Option<String>) -> Self {
        self.field(label, value.as_deref().unwrap_or(""))
    }

    pub fn row(
        mut self,
        sequence: u32,
        variety: &str,
        box_type: &str,
        quantity: i32,
        weight_kg: f64,
    ) -> Self {
        self.rows.push(ManifestRow {
            sequence,
            variety: variety.to_string(),
            box_type: box_type.to_string(),
            quantity,
            weight_kg,
        });
        self
    }

    pub fn signature_opt(mut self, label: &str, name: &Option<String>) -> Self {
        self.signatures.push(ManifestField {
            label: label.to_string(),
            value: name.clone().unwrap_or_default(),
        });
        self
    }

    pub fn build(mut self) -> Manifest {
        self.rows.sort_by_key(|row| row.sequence);
        let totals = ManifestTotals {
            lines: self.rows.len(),
            quantity: self.rows.iter().map(|r| r.quantity as i64).sum(),
            weight_kg: self.rows.iter().map(|r| r.weight_kg).sum(),
        };
        Manifest {
            sheet_id: self.sheet_id,
            header: self.header,
            rows: self.rows,
            totals,
            signatures: self.signatures,
        }
    }
}
