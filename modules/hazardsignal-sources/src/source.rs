// AlertSource: the single capability every feed adapter implements.
//
// Adapters are fail-open. Internally each one works in terms of
// `Result<Vec<AlertRecord>, SourceError>`; `fail_open` is the one place that
// turns an error into a warning and an empty contribution.

use std::future::Future;

use async_trait::async_trait;
use hazardsignal_common::AlertRecord;
use tracing::{info, warn};

use crate::error::Result;

#[async_trait]
pub trait AlertSource: Send + Sync {
    /// Human-readable feed name, used for logging and `AlertRecord::source`.
    fn name(&self) -> &str;

    /// Fetch and normalize the feed. Never fails: on any error the adapter
    /// logs and returns an empty list (or whatever it could parse).
    async fn fetch_alerts(&self) -> Vec<AlertRecord>;
}

/// Await an adapter's fallible fetch and absorb its error.
pub async fn fail_open<F>(source: &str, fetch: F) -> Vec<AlertRecord>
where
    F: Future<Output = Result<Vec<AlertRecord>>>,
{
    match fetch.await {
        Ok(alerts) => {
            info!(source, count = alerts.len(), "source: fetched alerts");
            alerts
        }
        Err(e) => {
            warn!(source, error = %e, "source: fetch failed, contributing no alerts");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;

    #[tokio::test]
    async fn errors_become_empty_lists() {
        let alerts = fail_open("broken", async {
            Err::<Vec<AlertRecord>, _>(SourceError::Parse("bad".into()))
        })
        .await;
        assert!(alerts.is_empty());
    }

    #[tokio::test]
    async fn missing_config_is_absorbed_too() {
        let alerts = fail_open("keyless", async {
            Err::<Vec<AlertRecord>, _>(SourceError::MissingConfig("FIRMS_MAP_KEY"))
        })
        .await;
        assert!(alerts.is_empty());
    }
}
