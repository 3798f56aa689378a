use crate::app::ports::PageFetcher;
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// `PageFetcher` over a shared `reqwest::Client`. The client pools
/// connections and is cheap to use from concurrent tasks.
#[derive(Debug, Clone)]
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for ReqwestHttp {
    async fn get(&self, url: &str) -> std::result::Result<String, String> {
        let resp = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        let resp = resp.error_for_status().map_err(|e| e.to_string())?;
        resp.text().await.map_err(|e| e.to_string())
    }
}
