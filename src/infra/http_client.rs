use crate::app::ports::ProviderSourcePort;
use crate::common::constants::USER_AGENT;
use crate::common::error::{FacilityError, Result};
use crate::common::types::ProviderDocument;
use crate::config::HttpConfig;
use crate::pipeline::ingestion::ProviderEndpoint;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Provider-finder client over `reqwest`
pub struct ReqwestProviderSource {
    client: reqwest::Client,
    retries: u32,
}

impl ReqwestProviderSource {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(http.timeout_seconds))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            retries: http.retries,
        })
    }

    async fn fetch_once(&self, url: &str, state: &str) -> Result<ProviderDocument> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FacilityError::Fetch {
                state: state.to_string(),
                message: e.to_string(),
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FacilityError::HttpStatus {
                state: state.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await.map_err(|e| FacilityError::Fetch {
            state: state.to_string(),
            message: e.to_string(),
        })?;
        debug!(state, bytes = bytes.len(), "Fetched provider document");
        let document: ProviderDocument = serde_json::from_slice(&bytes)?;
        Ok(document)
    }
}

/// Transport failures and 5xx responses may be retried; everything else is final.
fn is_retryable(err: &FacilityError) -> bool {
    match err {
        FacilityError::Fetch { .. } => true,
        FacilityError::HttpStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

#[async_trait]
impl ProviderSourcePort for ReqwestProviderSource {
    #[instrument(skip(self, endpoint))]
    async fn fetch_state(
        &self,
        endpoint: &ProviderEndpoint,
        state: &str,
    ) -> Result<ProviderDocument> {
        let url = endpoint.url_for(state);
        let mut attempt = 0;
        loop {
            match self.fetch_once(&url, state).await {
                Ok(document) => return Ok(document),
                Err(e) if attempt < self.retries && is_retryable(&e) => {
                    attempt += 1;
                    warn!(state, attempt, retries = self.retries, "Fetch failed, retrying: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
