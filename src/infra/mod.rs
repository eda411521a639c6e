// Adapters for the application ports

pub mod geopackage;
pub mod http_client;

pub use geopackage::GeoPackageImporter;
pub use http_client::ReqwestProviderSource;
