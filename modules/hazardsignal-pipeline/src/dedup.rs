//! Cross-source deduplication.
//!
//! Two records describe the same physical event when they share
//! `(type, coordinate cell, hour bucket)`. The first record seen for a key
//! survives; later ones are dropped. Input order is adapter order, so
//! earlier-registered adapters win ties.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use hazardsignal_common::{AlertRecord, AlertType};
use tracing::debug;

const HOUR_MILLIS: i64 = 3_600_000;

/// How coordinates are compared when building the dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatePrecision {
    /// Full-precision `lon,lat` of the geometry anchor.
    #[default]
    Exact,
    /// Geohash cell of the anchor with this many characters (1..=12).
    /// 5 is roughly city scale (~5 km), 7 roughly a block (~150 m).
    Geohash(usize),
}

impl CoordinatePrecision {
    pub fn from_geohash_len(len: Option<usize>) -> Self {
        match len {
            Some(n) => CoordinatePrecision::Geohash(n),
            None => CoordinatePrecision::Exact,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub alert_type: AlertType,
    pub cell: String,
    pub hour_bucket: i64,
}

/// `floor(epoch_millis / 3_600_000)`.
pub fn hour_bucket(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis().div_euclid(HOUR_MILLIS)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Deduplicator {
    precision: CoordinatePrecision,
}

impl Deduplicator {
    pub fn new(precision: CoordinatePrecision) -> Self {
        Self { precision }
    }

    pub fn precision(&self) -> CoordinatePrecision {
        self.precision
    }

    /// Records without `starts_at` are bucketed at `now`, the run's clock.
    pub fn key(&self, alert: &AlertRecord, now: DateTime<Utc>) -> DedupKey {
        DedupKey {
            alert_type: alert.alert_type,
            cell: self.cell(alert),
            hour_bucket: hour_bucket(alert.starts_at.unwrap_or(now)),
        }
    }

    /// Keep the first record per key, in input order.
    pub fn dedup(&self, alerts: Vec<AlertRecord>, now: DateTime<Utc>) -> Vec<AlertRecord> {
        let before = alerts.len();
        let mut seen = HashSet::new();
        let kept: Vec<AlertRecord> = alerts
            .into_iter()
            .filter(|a| seen.insert(self.key(a, now)))
            .collect();
        debug!(before, after = kept.len(), "dedup: collapsed duplicates");
        kept
    }

    fn cell(&self, alert: &AlertRecord) -> String {
        let [lon, lat] = alert.geometry.anchor();
        match self.precision {
            CoordinatePrecision::Exact => format!("{lon},{lat}"),
            CoordinatePrecision::Geohash(len) => {
                geohash::encode(geohash::Coord { x: lon, y: lat }, len)
                    .unwrap_or_else(|_| format!("{lon},{lat}"))
            }
        }
    }
}
