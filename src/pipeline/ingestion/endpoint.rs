use crate::config::PipelineConfig;

/// Provider-finder service endpoint plus the page size used to pull a whole
/// state in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoint {
    base: String,
    page_size: u32,
}

impl ProviderEndpoint {
    pub fn new(base: impl Into<String>, page_size: u32) -> Self {
        Self {
            base: base.into(),
            page_size,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.endpoint.clone(), config.page_size)
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// `<base>?loc=ST|<STATE>&sort=1|ASC&paging=1|<PAGE_SIZE>`
    pub fn url_for(&self, state: &str) -> String {
        let sep = if self.base.contains('?') { '&' } else { '?' };
        format!(
            "{}{}loc=ST|{}&sort=1|ASC&paging=1|{}",
            self.base, sep, state, self.page_size
        )
    }
}
