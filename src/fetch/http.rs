use std::time::Duration;

use async_trait::async_trait;

use crate::error::HunterError;
use crate::fetch::{FetchError, PageFetcher, PageKind};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Plain GET fetcher. Pages that render their listing with JavaScript come
/// back without job links; use the Chrome fetcher for those.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, HunterError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| HunterError::Browser(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch(&self, url: &str, _kind: PageKind) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Cache-Control", "no-cache")
            .header("Pragma", "no-cache")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::new(format!("Timeout {}ms exceeded", REQUEST_TIMEOUT.as_millis()))
                } else {
                    FetchError::new(format!("Request failed: {e}"))
                }
            })?;

        if !resp.status().is_success() {
            return Err(FetchError::new(format!("{url} returned {}", resp.status())));
        }

        resp.text()
            .await
            .map_err(|e| FetchError::new(format!("Failed to read body: {e}")))
    }
}
