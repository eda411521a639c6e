// Pipeline ingestion: state walk and provider-finder endpoints

pub mod endpoint;
pub mod states;

pub use endpoint::ProviderEndpoint;
pub use states::{StateList, StatePosition};
