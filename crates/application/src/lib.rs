//! Application layer - Allocation use cases and manifest export

pub mod allocation;
pub mod manifest;

pub use allocation::{AllocationService, AllocationSettings};
pub use manifest::{BoxWeights, Manifest, ManifestBuilder};
