// Feed transport: the outbound GET every HTTP adapter performs.
//
// Adapters hold an `Arc<dyn FeedTransport>` so tests can swap in
// `testing::MockTransport`: no network, deterministic bodies and failures.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::debug;

const USER_AGENT: &str = "hazardsignal/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// GET `url` and return the body as text. Non-2xx responses are errors.
    async fn get_text(&self, url: &str) -> Result<String>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build feed HTTP client");
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .context("Feed request failed")?
            .error_for_status()
            .context("Feed returned an error status")?;

        let body = resp.text().await.context("Failed to read feed body")?;
        debug!(bytes = body.len(), "transport: body received");
        Ok(body)
    }
}
