pub mod app;
pub mod common;
pub mod config;
pub mod infra;
pub mod observability;
pub mod pipeline;

pub use common::error::{FacilityError, Result};
pub use common::types::{FacilityKind, FacilityRecord, ProviderDocument};
