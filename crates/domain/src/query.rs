use crate::sheet::LoadingSheet;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Carrier-assignment filter for sheet listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CarrierFilter {
    #[default]
    Any,
    Assigned,
    Unassigned,
}

/// Listing filter. Text filters are case-insensitive substring matches and
/// the date range is inclusive on both ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SheetFilter {
    pub client: Option<String>,
    pub container: Option<String>,
    pub bill_number: Option<String>,
    pub loading_from: Option<NaiveDate>,
    pub loading_to: Option<NaiveDate>,
    pub carrier: CarrierFilter,
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub page_size: u64,
}

impl PageRequest {
    /// Clamps to 1 <= page_size <= max_page_size and to a page whose offset
    /// fits a signed 64-bit SQL `OFFSET`.
    pub fn new(page: Option<u64>, page_size: Option<u64>, default_size: u64, max_size: u64) -> Self {
        let page_size = page_size.unwrap_or(default_size).clamp(1, max_size.max(1));
        let last_page = i64::MAX as u64 / page_size;
        Self {
            page: page.unwrap_or(1).clamp(1, last_page),
            page_size,
        }
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// One page of sheets ordered by loading date descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetPage {
    pub items: Vec<LoadingSheet>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}
