// Pipeline processing: record normalization and aggregation

pub mod aggregate;
pub mod normalize;
pub mod supl;

pub use aggregate::{FacilityTable, StateSummary};
pub use normalize::{normalize_phone, RecordNormalizer};
