// Test doubles for adapters and the aggregator.
//
// - MockTransport (FeedTransport): HashMap-based URL → body or failure
// - StaticSource (AlertSource): returns a fixed list
// - StallingSource (AlertSource): sleeps before answering, for timeout tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use hazardsignal_common::AlertRecord;

use crate::source::AlertSource;
use crate::transport::FeedTransport;

// ---------------------------------------------------------------------------
// MockTransport
// ---------------------------------------------------------------------------

enum Canned {
    Body(String),
    Failure(String),
}

/// Returns `Err` for unregistered URLs.
/// Builder pattern: `.on_get()`, `.on_failure()`.
pub struct MockTransport {
    responses: HashMap<String, Canned>,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn on_get(mut self, url: &str, body: impl Into<String>) -> Self {
        self.responses
            .insert(url.to_string(), Canned::Body(body.into()));
        self
    }

    /// Simulate a transport failure (DNS, connection, non-2xx) for `url`.
    pub fn on_failure(mut self, url: &str, message: &str) -> Self {
        self.responses
            .insert(url.to_string(), Canned::Failure(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedTransport for MockTransport {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(url) {
            Some(Canned::Body(body)) => Ok(body.clone()),
            Some(Canned::Failure(message)) => Err(anyhow::anyhow!("{message}")),
            None => Err(anyhow::anyhow!("MockTransport: nothing registered for {url}")),
        }
    }
}

// ---------------------------------------------------------------------------
// StaticSource / StallingSource
// ---------------------------------------------------------------------------

pub struct StaticSource {
    name: String,
    alerts: Vec<AlertRecord>,
}

impl StaticSource {
    pub fn new(name: &str, alerts: Vec<AlertRecord>) -> Self {
        Self {
            name: name.to_string(),
            alerts,
        }
    }

    pub fn empty(name: &str) -> Self {
        Self::new(name, Vec::new())
    }
}

#[async_trait]
impl AlertSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_alerts(&self) -> Vec<AlertRecord> {
        self.alerts.clone()
    }
}

/// Answers only after `delay`. Pair with a shorter aggregator timeout.
pub struct StallingSource {
    name: String,
    delay: Duration,
    alerts: Vec<AlertRecord>,
}

impl StallingSource {
    pub fn new(name: &str, delay: Duration, alerts: Vec<AlertRecord>) -> Self {
        Self {
            name: name.to_string(),
            delay,
            alerts,
        }
    }
}

#[async_trait]
impl AlertSource for StallingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_alerts(&self) -> Vec<AlertRecord> {
        tokio::time::sleep(self.delay).await;
        self.alerts.clone()
    }
}
