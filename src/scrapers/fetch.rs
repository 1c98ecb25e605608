use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::scrapers::traits::PageFetcher;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

/// Plain HTTP fetcher; one request per page, no retries.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| PipelineError::Fetch {
                url: config.start_url.clone(),
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String> {
        debug!(url = %url, "Fetching page");

        let fetch_error = |e: reqwest::Error| PipelineError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Page fetch rejected");
            return Err(PipelineError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(fetch_error)?;
        debug!(url = %url, bytes = html.len(), "Downloaded page");
        Ok(html)
    }
}
