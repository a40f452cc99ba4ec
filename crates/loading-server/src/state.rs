use std::sync::Arc;

use application::{AllocationService, AllocationSettings, BoxWeights};
use domain::{AllocationStore, PageRequest};
use infrastructure::{ServerConfig, TimestampSheetIdGenerator};

/// Shared handler state, built once at startup.
pub struct AppState<S: AllocationStore> {
    pub allocation: AllocationService<S>,
    pub box_weights: BoxWeights,
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl<S: AllocationStore> AppState<S> {
    pub fn new(allocation: AllocationService<S>, box_weights: BoxWeights) -> Self {
        Self {
            allocation,
            box_weights,
            default_page_size: 20,
            max_page_size: 100,
        }
    }

    pub fn with_paging(mut self, default_page_size: u64, max_page_size: u64) -> Self {
        self.default_page_size = default_page_size;
        self.max_page_size = max_page_size;
        self
    }

    /// Wire `store` with the id generator, id retry count, paging and box
    /// weights from `config`.
    pub fn from_config(store: S, config: &ServerConfig) -> Self {
        let allocation = AllocationService::new(
            Arc::new(store),
            Arc::new(TimestampSheetIdGenerator::default()),
            AllocationSettings {
                id_attempts: config.allocation.id_attempts,
            },
        );
        let weights = BoxWeights::new(
            config.manifest.default_box_weight_kg,
            config.manifest.box_weights.clone(),
        );
        Self::new(allocation, weights).with_paging(
            config.allocation.default_page_size,
            config.allocation.max_page_size,
        )
    }

    pub fn page_request(&self, page: Option<u64>, page_size: Option<u64>) -> PageRequest {
        PageRequest::new(page, page_size, self.default_page_size, self.max_page_size)
    }
}
