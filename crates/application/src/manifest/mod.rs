mod builder;

pub use builder::{BoxWeights, COLUMNS, Manifest, ManifestBuilder, ManifestField, ManifestRow, ManifestTotals};
