//! Remote text fetching behind a trait so the pipeline can run on stubs.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::ScraperConfig;
use crate::core::{DocsError, Result};

#[async_trait]
pub trait DocFetcher: Send + Sync {
    /// Body of `url` as text; non-2xx statuses are errors.
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| DocsError::http("<client>", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl DocFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DocsError::http(url, e))?;

        let status = response.status();
        if !status.is_success() {
            error!("HTTP error {} for {}", status, url);
            return Err(DocsError::http(url, format!("status {}", status)));
        }

        let bytes = response.bytes().await.map_err(|e| DocsError::http(url, e))?;
        Ok(crate::core::decode_text(&bytes))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned bodies; unknown URLs answer 404.
    #[derive(Default)]
    pub struct StubFetcher {
        pages: HashMap<String, String>,
        pub requested: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn with_page(mut self, url: &str, body: &str) -> Self {
            self.pages.insert(url.to_string(), body.to_string());
            self
        }
    }

    #[async_trait]
    impl DocFetcher for StubFetcher {
        async fn fetch_text(&self, url: &str) -> Result<String> {
            if let Ok(mut requested) = self.requested.lock() {
                requested.push(url.to_string());
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| DocsError::http(url, "status 404 Not Found"))
        }
    }
}
