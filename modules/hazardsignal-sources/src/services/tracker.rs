// Open-event tracker adapter: NASA EONET v3 events JSON.
//
// Each event carries a history of geometries; the latest one is the alert's
// geometry, the earliest date is its start.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hazardsignal_common::{alert_id, headline_or_default, AlertRecord, Geometry, Position};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::classify::{category_type, infer_type, tracker_severity};
use crate::error::{Result, SourceError};
use crate::rate_limit::RateLimiter;
use crate::source::{fail_open, AlertSource};
use crate::transport::FeedTransport;

pub const EONET_TAG: &str = "eonet";
pub const EONET_NAME: &str = "NASA EONET";
pub const EONET_DEFAULT_URL: &str =
    "https://eonet.gsfc.nasa.gov/api/v3/events?status=open&limit=100";

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    title: Option<String>,
    description: Option<String>,
    link: Option<String>,
    closed: Option<String>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    sources: Vec<EventSource>,
    #[serde(default)]
    geometry: Vec<EventGeometry>,
}

#[derive(Debug, Deserialize)]
struct Category {
    #[serde(default)]
    id: Value,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventSource {
    id: Option<String>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventGeometry {
    #[serde(rename = "magnitudeValue")]
    magnitude_value: Option<f64>,
    #[serde(rename = "magnitudeUnit")]
    magnitude_unit: Option<String>,
    date: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    coordinates: Value,
}

pub struct OpenEventTrackerSource {
    transport: Arc<dyn FeedTransport>,
    feed_url: String,
    limiter: RateLimiter,
}

impl OpenEventTrackerSource {
    pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
        Self {
            transport,
            feed_url: EONET_DEFAULT_URL.to_string(),
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
        if !self.limiter.try_acquire() {
            return Err(SourceError::RateLimited {
                source_name: EONET_NAME.to_string(),
            });
        }
        let body = self.transport.get_text(&self.feed_url).await?;
        parse_events(&body)
    }
}

#[async_trait]
impl AlertSource for OpenEventTrackerSource {
    fn name(&self) -> &str {
        EONET_NAME
    }

    async fn fetch_alerts(&self) -> Vec<AlertRecord> {
        fail_open(EONET_NAME, self.try_fetch()).await
    }
}

/// Parse an `{"events": [...]}` document.
pub fn parse_events(body: &str) -> Result<Vec<AlertRecord>> {
    let doc: Value =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(format!("tracker: {e}")))?;
    let events = doc
        .get("events")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Parse("tracker: no events array".to_string()))?;

    Ok(events.iter().filter_map(normalize_event).collect())
}

fn normalize_event(raw: &Value) -> Option<AlertRecord> {
    let event: Event = match serde_json::from_value(raw.clone()) {
        Ok(e) => e,
        Err(e) => {
            debug!(error = %e, "tracker: skipping malformed event");
            return None;
        }
    };

    let dated: Vec<(Option<DateTime<Utc>>, &EventGeometry)> = event
        .geometry
        .iter()
        .map(|g| (g.date.as_deref().and_then(parse_rfc3339), g))
        .collect();

    // Latest usable geometry wins. Undated entries sort first.
    let (_, latest) = dated
        .iter()
        .filter(|(_, g)| to_geometry(g).is_some())
        .max_by_key(|(date, _)| *date)?;
    let geometry = to_geometry(latest)?;
    let starts_at = dated.iter().filter_map(|(d, _)| *d).min();

    let category_ids: Vec<String> = event.categories.iter().map(|c| category_id(&c.id)).collect();
    let title = event.title.as_deref().unwrap_or_default();
    let alert_type = category_ids
        .iter()
        .find_map(|id| category_type(id))
        .unwrap_or_else(|| infer_type(title, event.description.as_deref().unwrap_or_default()));

    let magnitude = match (latest.magnitude_value, latest.magnitude_unit.as_deref()) {
        (Some(v), Some(unit)) if v.is_finite() => Some((v, unit)),
        _ => None,
    };
    let severity = tracker_severity(alert_type, magnitude);

    let mut payload = BTreeMap::new();
    if !category_ids.is_empty() {
        payload.insert("categories".to_string(), json!(category_ids));
    }
    if let Some(category_title) = event.categories.first().and_then(|c| c.title.as_ref()) {
        payload.insert("category".to_string(), json!(category_title));
    }
    if let Some((value, unit)) = magnitude {
        payload.insert("magnitudeValue".to_string(), json!(value));
        payload.insert("magnitudeUnit".to_string(), json!(unit));
    }
    if let Some(link) = &event.link {
        payload.insert("link".to_string(), json!(link));
    }
    let source_urls: Vec<&str> = event
        .sources
        .iter()
        .filter_map(|s| s.url.as_deref().or(s.id.as_deref()))
        .collect();
    if !source_urls.is_empty() {
        payload.insert("sources".to_string(), json!(source_urls));
    }

    Some(
        AlertRecord::builder()
            .id(alert_id(EONET_TAG, &event.id))
            .external_id(event.id.clone())
            .source(EONET_NAME)
            .alert_type(alert_type)
            .severity(severity)
            .headline(headline_or_default(event.title.as_deref(), alert_type))
            .description(event.description.clone().filter(|d| !d.trim().is_empty()))
            .geometry(geometry)
            .starts_at(starts_at)
            .ends_at(event.closed.as_deref().and_then(parse_rfc3339))
            .payload(payload)
            .build(),
    )
}

/// Category ids are strings in v3 and integers in older payloads.
fn category_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn to_geometry(g: &EventGeometry) -> Option<Geometry> {
    match g.kind.as_deref() {
        Some("Point") => {
            let [lon, lat] = position(&g.coordinates)?;
            Geometry::point(lon, lat)
        }
        Some("LineString") => Geometry::line_string(positions(&g.coordinates)?),
        Some("Polygon") => {
            let rings = g
                .coordinates
                .as_array()?
                .iter()
                .map(positions)
                .collect::<Option<Vec<_>>>()?;
            Geometry::polygon(rings)
        }
        _ => None,
    }
}

fn position(v: &Value) -> Option<Position> {
    let arr = v.as_array()?;
    Some([arr.first()?.as_f64()?, arr.get(1)?.as_f64()?])
}

fn positions(v: &Value) -> Option<Vec<Position>> {
    v.as_array()?.iter().map(position).collect()
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazardsignal_common::{AlertType, Severity};

    const EVENTS: &str = r#"{
      "title": "EONET Events",
      "events": [
        {
          "id": "EONET_7001",
          "title": "Tropical Storm Ana",
          "description": "",
          "link": "https://eonet.gsfc.nasa.gov/api/v3/events/EONET_7001",
          "closed": null,
          "categories": [{"id": "severeStorms", "title": "Severe Storms"}],
          "sources": [{"id": "JTWC", "url": "https://www.metoc.navy.mil/jtwc/"}],
          "geometry": [
            {"magnitudeValue": 35.0, "magnitudeUnit": "kts", "date": "2024-05-01T00:00:00Z", "type": "Point", "coordinates": [-60.0, 15.0]},
            {"magnitudeValue": 70.0, "magnitudeUnit": "kts", "date": "2024-05-02T00:00:00Z", "type": "Point", "coordinates": [-62.5, 16.1]}
          ]
        },
        {
          "id": "EONET_7002",
          "title": "Canyon Fire, California",
          "categories": [{"id": "wildfires", "title": "Wildfires"}],
          "sources": [],
          "geometry": [
            {"magnitudeValue": null, "magnitudeUnit": null, "date": "2024-05-03T00:00:00Z", "type": "Polygon",
             "coordinates": [[[-120.0, 38.0], [-119.9, 38.0], [-119.9, 38.1], [-120.0, 38.0]]]}
          ]
        },
        {
          "id": "EONET_7003",
          "title": "Mystery event",
          "categories": [{"id": "dustHaze", "title": "Dust and Haze"}],
          "geometry": [{"date": "2024-05-03T00:00:00Z", "type": "Point", "coordinates": ["x", 1.0]}]
        },
        {
          "id": "EONET_7004",
          "title": "Etna eruption",
          "closed": "2024-05-05T00:00:00Z",
          "categories": [{"id": 12, "title": "Volcanoes"}],
          "geometry": [{"date": "2024-05-04T00:00:00Z", "type": "Point", "coordinates": [15.0, 37.75]}]
        },
        {"title": "no id at all", "geometry": []}
      ]
    }"#;

    #[test]
    fn uses_latest_geometry_and_earliest_start() {
        let alerts = parse_events(EVENTS).unwrap();
        let storm = &alerts[0];
        assert_eq!(storm.geometry, Geometry::Point([-62.5, 16.1]));
        assert_eq!(storm.starts_at.unwrap().to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert_eq!(storm.alert_type, AlertType::Hurricane);
        assert_eq!(storm.severity, Severity::Severe);
        assert_eq!(storm.description, None);
        assert_eq!(storm.payload["sources"], json!(["https://www.metoc.navy.mil/jtwc/"]));
    }

    #[test]
    fn polygon_geometry_is_kept() {
        let alerts = parse_events(EVENTS).unwrap();
        let fire = &alerts[1];
        assert_eq!(fire.alert_type, AlertType::Wildfire);
        assert_eq!(fire.severity, Severity::Moderate);
        assert_eq!(fire.geometry.kind(), "Polygon");
    }

    #[test]
    fn skips_unusable_events() {
        let alerts = parse_events(EVENTS).unwrap();
        let ids: Vec<_> = alerts.iter().filter_map(|a| a.external_id.clone()).collect();
        assert_eq!(ids, vec!["EONET_7001", "EONET_7002", "EONET_7004"]);
    }

    #[test]
    fn numeric_category_falls_back_to_keywords_and_closed_sets_end() {
        let alerts = parse_events(EVENTS).unwrap();
        let volcano = &alerts[2];
        assert_eq!(volcano.alert_type, AlertType::Volcano);
        assert_eq!(volcano.ends_at.unwrap().to_rfc3339(), "2024-05-05T00:00:00+00:00");
        assert!(!volcano.is_ongoing());
    }

    #[test]
    fn missing_events_array_is_a_parse_error() {
        assert!(matches!(
            parse_events(r#"{"title": "EONET Events"}"#),
            Err(SourceError::Parse(_))
        ));
    }
}
