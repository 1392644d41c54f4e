// Satellite fire adapter: NASA FIRMS area CSV.
//
// Column order is fixed by the feed; the header row is skipped rather than
// interpreted. Rows without usable coordinates are dropped.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use csv::StringRecord;
use hazardsignal_common::{alert_id, headline_or_default, AlertRecord, AlertType, Geometry};
use serde_json::json;
use tracing::debug;

use crate::classify::{fire_severity, FireConfidence};
use crate::error::{Result, SourceError};
use crate::rate_limit::RateLimiter;
use crate::source::{fail_open, AlertSource};
use crate::transport::FeedTransport;

pub const FIRMS_TAG: &str = "firms";
pub const FIRMS_NAME: &str = "NASA FIRMS Active Fires";
/// `{map_key}` is substituted at request time.
pub const FIRMS_DEFAULT_URL: &str =
    "https://firms.modaps.eosdis.nasa.gov/api/area/csv/{map_key}/VIIRS_SNPP_NRT/world/1";

// latitude,longitude,brightness,scan,track,acq_date,acq_time,satellite,
// instrument,confidence,version,bright_t31,frp,daynight
const COL_LATITUDE: usize = 0;
const COL_LONGITUDE: usize = 1;
const COL_BRIGHTNESS: usize = 2;
const COL_ACQ_DATE: usize = 5;
const COL_ACQ_TIME: usize = 6;
const COL_SATELLITE: usize = 7;
const COL_INSTRUMENT: usize = 8;
const COL_CONFIDENCE: usize = 9;
const COL_FRP: usize = 12;
const COL_DAYNIGHT: usize = 13;
const MIN_COLUMNS: usize = COL_CONFIDENCE + 1;

pub struct SatelliteFireSource {
    transport: Arc<dyn FeedTransport>,
    map_key: Option<String>,
    feed_url: String,
    limiter: RateLimiter,
}

impl SatelliteFireSource {
    pub fn new(transport: Arc<dyn FeedTransport>, map_key: Option<String>) -> Self {
        Self {
            transport,
            map_key,
            feed_url: FIRMS_DEFAULT_URL.to_string(),
            limiter: RateLimiter::default(),
        }
    }

    pub fn with_feed_url(mut self, url: impl Into<String>) -> Self {
        self.feed_url = url.into();
        self
    }

    pub fn with_rate_limit(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    async fn try_fetch(&self) -> Result<Vec<AlertRecord>> {
        let map_key = self
            .map_key
            .as_deref()
            .ok_or(SourceError::MissingConfig("FIRMS_MAP_KEY"))?;
        if !self.limiter.try_acquire() {
            return Err(SourceError::RateLimited {
                source_name: FIRMS_NAME.to_string(),
            });
        }
        let url = self.feed_url.replace("{map_key}", map_key);
        let body = self.transport.get_text(&url).await?;
        parse_csv(&body)
    }
}

#[async_trait]
impl AlertSource for SatelliteFireSource {
    fn name(&self) -> &str {
        FIRMS_NAME
    }

    async fn fetch_alerts(&self) -> Vec<AlertRecord> {
        fail_open(FIRMS_NAME, self.try_fetch()).await
    }
}

/// Parse FIRMS CSV. The first non-blank line is the header; columns are read
/// by position. Quoted fields follow RFC 4180.
pub fn parse_csv(body: &str) -> Result<Vec<AlertRecord>> {
    let header = body
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| SourceError::Parse("fire: empty body".to_string()))?;
    // FIRMS answers bad keys and quota errors with plain text, not CSV.
    if !header.contains(',') {
        return Err(SourceError::Parse(format!("fire: unexpected header {header:?}")));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.trim_start().as_bytes());

    Ok(reader
        .records()
        .filter_map(|row| match row {
            Ok(record) => normalize_row(&record),
            Err(e) => {
                debug!(error = %e, "fire: skipping unreadable row");
                None
            }
        })
        .collect())
}

fn normalize_row(row: &StringRecord) -> Option<AlertRecord> {
    if row.len() < MIN_COLUMNS {
        debug!(columns = row.len(), "fire: skipping short row");
        return None;
    }
    let col = |i: usize| row.get(i).unwrap_or_default();

    let (lat, lon) = match (
        col(COL_LATITUDE).parse::<f64>(),
        col(COL_LONGITUDE).parse::<f64>(),
    ) {
        (Ok(lat), Ok(lon)) => (lat, lon),
        _ => {
            debug!(row = ?row, "fire: skipping row with unparseable coordinates");
            return None;
        }
    };
    let geometry = Geometry::point(lon, lat)?;

    let brightness = col(COL_BRIGHTNESS).parse::<f64>().ok().filter(|b| b.is_finite());
    let confidence = FireConfidence::parse(col(COL_CONFIDENCE));
    let severity = fire_severity(confidence, brightness);

    let acq_date = col(COL_ACQ_DATE);
    let acq_time = col(COL_ACQ_TIME);
    let satellite = col(COL_SATELLITE);
    let instrument = col(COL_INSTRUMENT);
    let native_id = format!(
        "{},{},{acq_date},{acq_time},{satellite}",
        col(COL_LATITUDE),
        col(COL_LONGITUDE)
    );

    let mut payload = BTreeMap::new();
    if let Some(b) = brightness {
        payload.insert("brightness".to_string(), json!(b));
    }
    payload.insert("confidence".to_string(), json!(confidence.as_str()));
    payload.insert("confidenceRaw".to_string(), json!(col(COL_CONFIDENCE)));
    if let Some(frp) = row.get(COL_FRP).and_then(|v| v.parse::<f64>().ok()) {
        payload.insert("frp".to_string(), json!(frp));
    }
    if !satellite.is_empty() {
        payload.insert("satellite".to_string(), json!(satellite));
    }
    if !instrument.is_empty() {
        payload.insert("instrument".to_string(), json!(instrument));
    }
    if let Some(daynight) = row.get(COL_DAYNIGHT).filter(|v| !v.is_empty()) {
        payload.insert("daynight".to_string(), json!(daynight));
    }

    let headline = if instrument.is_empty() {
        "Active fire detected by satellite".to_string()
    } else {
        format!("Active fire detected by {instrument}")
    };

    Some(
        AlertRecord::builder()
            .id(alert_id(FIRMS_TAG, &native_id))
            .source(FIRMS_NAME)
            .alert_type(AlertType::Wildfire)
            .severity(severity)
            .headline(headline_or_default(Some(&headline), AlertType::Wildfire))
            .geometry(geometry)
            .starts_at(acquisition_time(acq_date, acq_time))
            .payload(payload)
            .build(),
    )
}

/// `acq_date` is `YYYY-MM-DD`, `acq_time` is `HHMM` UTC, sometimes without
/// leading zeros ("42" is 00:42).
fn acquisition_time(date: &str, time: &str) -> Option<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
    let digits: u32 = time.parse().ok()?;
    let time = NaiveTime::from_hms_opt(digits / 100, digits % 100, 0)?;
    Some(date.and_time(time).and_utc())
}
