//! Aggregator: fan out to every configured source, collect, dedup, dispatch.
//!
//! Sources are polled concurrently. Each call is bounded by its own timeout;
//! a source that times out contributes nothing, exactly like one that failed.
//! Results land in per-source slots and are concatenated in source order
//! after all calls settle, so output order never depends on which feed
//! answered first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use hazardsignal_common::{AlertRecord, Config};
use hazardsignal_sources::AlertSource;
use tracing::{info, warn};
use typed_builder::TypedBuilder;

use crate::dedup::{CoordinatePrecision, Deduplicator};
use crate::dispatch::AlertDispatcher;

#[derive(Debug, Clone, Copy, TypedBuilder)]
pub struct AggregatorSettings {
    #[builder(default = Duration::from_secs(20))]
    pub adapter_timeout: Duration,
    #[builder(default)]
    pub precision: CoordinatePrecision,
}

impl AggregatorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self::builder()
            .adapter_timeout(Duration::from_secs(config.adapter_timeout_secs))
            .precision(CoordinatePrecision::from_geohash_len(
                config.dedup_geohash_precision,
            ))
            .build()
    }
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOutcome {
    /// The source answered in time with this many records (possibly zero).
    Completed(usize),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct SourceReport {
    pub source: String,
    pub outcome: SourceOutcome,
    pub elapsed: Duration,
}

/// Everything one aggregation cycle produced.
#[derive(Debug, Clone)]
pub struct AggregationRun {
    pub alerts: Vec<AlertRecord>,
    pub reports: Vec<SourceReport>,
    /// Records collected before dedup.
    pub collected: usize,
}

pub struct Aggregator {
    sources: Vec<Arc<dyn AlertSource>>,
    settings: AggregatorSettings,
    dedup: Deduplicator,
    dispatcher: Option<Arc<dyn AlertDispatcher>>,
}

impl Aggregator {
    /// Sources are polled and concatenated in the order given.
    pub fn new(sources: Vec<Arc<dyn AlertSource>>, settings: AggregatorSettings) -> Self {
        Self {
            sources,
            dedup: Deduplicator::new(settings.precision),
            settings,
            dispatcher: None,
        }
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn AlertDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// The pipeline's public surface: one deduplicated list per call.
    pub async fn fetch_all_alerts(&self) -> Vec<AlertRecord> {
        self.run().await.alerts
    }

    pub async fn run(&self) -> AggregationRun {
        self.run_at(Utc::now()).await
    }

    /// Run with an explicit clock; `now` buckets records that lack a start time.
    pub async fn run_at(&self, now: DateTime<Utc>) -> AggregationRun {
        info!(
            sources = ?self.source_names(),
            precision = ?self.dedup.precision(),
            "Starting aggregation run"
        );

        let timeout = self.settings.adapter_timeout;
        let slots = join_all(self.sources.iter().map(|source| async move {
            let started = Instant::now();
            let result = tokio::time::timeout(timeout, source.fetch_alerts()).await;
            let elapsed = started.elapsed();
            match result {
                Ok(alerts) => {
                    let report = SourceReport {
                        source: source.name().to_string(),
                        outcome: SourceOutcome::Completed(alerts.len()),
                        elapsed,
                    };
                    (alerts, report)
                }
                Err(_) => {
                    warn!(
                        source = source.name(),
                        timeout_secs = timeout.as_secs_f64(),
                        "Source timed out, contributing no alerts"
                    );
                    let report = SourceReport {
                        source: source.name().to_string(),
                        outcome: SourceOutcome::TimedOut,
                        elapsed,
                    };
                    (Vec::new(), report)
                }
            }
        }))
        .await;

        let mut collected = Vec::new();
        let mut reports = Vec::with_capacity(slots.len());
        for (alerts, report) in slots {
            collected.extend(alerts);
            reports.push(report);
        }

        let collected_count = collected.len();
        let alerts = self.dedup.dedup(collected, now);

        info!(
            collected = collected_count,
            deduplicated = alerts.len(),
            timed_out = reports
                .iter()
                .filter(|r| r.outcome == SourceOutcome::TimedOut)
                .count(),
            "Aggregation run complete"
        );

        if let Some(dispatcher) = &self.dispatcher {
            let dispatcher = Arc::clone(dispatcher);
            let batch = alerts.clone();
            tokio::spawn(async move {
                if let Err(e) = dispatcher.dispatch(batch).await {
                    warn!(error = %e, "Alert dispatch failed");
                }
            });
        }

        AggregationRun {
            alerts,
            reports,
            collected: collected_count,
        }
    }
}
