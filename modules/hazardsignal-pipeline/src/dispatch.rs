// Dispatch hook: where the deduplicated list goes after each run.
//
// The aggregator spawns `dispatch()` and never waits on it. Delivery policy
// (push, persistence, "seen before" caching) belongs to the implementation.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hazardsignal_common::AlertRecord;
use tracing::info;

#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn dispatch(&self, alerts: Vec<AlertRecord>) -> Result<()>;
}

// ---------------------------------------------------------------------------
// LogDispatcher (default)
// ---------------------------------------------------------------------------

/// Logs the run's size and a severity histogram.
pub struct LogDispatcher;

#[async_trait]
impl AlertDispatcher for LogDispatcher {
    async fn dispatch(&self, alerts: Vec<AlertRecord>) -> Result<()> {
        let mut by_severity: BTreeMap<String, usize> = BTreeMap::new();
        for alert in &alerts {
            *by_severity.entry(alert.severity.to_string()).or_default() += 1;
        }
        info!(
            count = alerts.len(),
            severities = ?by_severity,
            "dispatch: alerts ready"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// WebhookDispatcher (production)
// ---------------------------------------------------------------------------

/// POSTs `{"alerts": [...]}` to a downstream endpoint.
pub struct WebhookDispatcher {
    http: reqwest::Client,
    url: String,
}

impl WebhookDispatcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build webhook HTTP client"),
            url: url.into(),
        }
    }
}

#[async_trait]
impl AlertDispatcher for WebhookDispatcher {
    async fn dispatch(&self, alerts: Vec<AlertRecord>) -> Result<()> {
        info!(
            url = self.url.as_str(),
            count = alerts.len(),
            "Dispatching alerts to webhook"
        );

        let body = serde_json::json!({ "alerts": alerts });
        let resp = self.http.post(&self.url).json(&body).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let error_text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Webhook dispatch failed ({}): {}", status, error_text);
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MockDispatcher (for tests)
// ---------------------------------------------------------------------------

/// Records `dispatch()` calls for test assertions.
pub struct MockDispatcher {
    calls: Mutex<Vec<Vec<AlertRecord>>>,
}

impl MockDispatcher {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<AlertRecord>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Default for MockDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AlertDispatcher for MockDispatcher {
    async fn dispatch(&self, alerts: Vec<AlertRecord>) -> Result<()> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alerts);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazardsignal_sources::SyntheticSource;

    #[tokio::test]
    async fn mock_records_each_call() {
        let mock = MockDispatcher::new();
        mock.dispatch(SyntheticSource::seed_alerts()).await.unwrap();
        mock.dispatch(Vec::new()).await.unwrap();
        let calls = mock.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].len(), SyntheticSource::seed_alerts().len());
        assert!(calls[1].is_empty());
    }

    #[tokio::test]
    async fn log_dispatcher_never_fails() {
        assert!(LogDispatcher.dispatch(SyntheticSource::seed_alerts()).await.is_ok());
    }
}
