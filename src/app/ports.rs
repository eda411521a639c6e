use crate::common::error::Result;
use crate::common::types::ProviderDocument;
use crate::pipeline::ingestion::ProviderEndpoint;
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;

// Ingest-side ports
#[async_trait]
pub trait ProviderSourcePort: Send + Sync {
    /// Fetches and parses the provider-finder document for one state.
    async fn fetch_state(&self, endpoint: &ProviderEndpoint, state: &str)
        -> Result<ProviderDocument>;
}

// Output-side ports
pub trait SpatialImporterPort: Send + Sync {
    /// Removes any existing database of the configured name and creates an
    /// empty one.
    fn reset(&self) -> Result<()>;

    /// Builds a point layer from the latitude/longitude columns of a CSV,
    /// replacing a layer of the same name.
    fn import_points(&self, request: &PointImportRequest) -> Result<PointImportReport>;
}

#[derive(Clone, Debug)]
pub struct PointImportRequest {
    pub csv_path: PathBuf,
    pub layer_name: String,
    pub latitude_field: String,
    pub longitude_field: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PointImportReport {
    pub database: PathBuf,
    pub layer_name: String,
    pub features: usize,
    /// Rows whose coordinates did not parse
    pub skipped: usize,
}
