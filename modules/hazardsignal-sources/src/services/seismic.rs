// Seismic catalog adapter: GeoJSON FeatureCollection (USGS summary feeds).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hazardsignal_common::{alert_id, AlertRecord, AlertType, Geometry};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::classify::seismic_severity;
use crate::error::{Result, SourceError};
use crate::rate_limit::RateLimiter;
use crate::source::{fail_open, AlertSource};
use crate::transport::FeedTransport;

pub const USGS_TAG: &str = "usgs";
pub const USGS_NAME: &str = "USGS Earthquake Catalog";
pub const USGS_DEFAULT_URL: &str =
    "https://earthquake.usgs.gov/earthquakes/feed/v1.0/summary/all_hour.geojson";

#[derive(Debug, Deserialize)]
struct Feature {
    id: Option<String>,
    #[serde(default)]
    properties: Properties,
    geometry: Option<PointGeometry>,
}

#[derive(Debug, Default, Deserialize)]
struct Properties {
    mag: Option<f64>,
    place: Option<String>,
    time: Option<i64>,
    updated: Option<i64>,
    url: Option<String>,
    title: Option<String>,
    tsunami: Option<i64>,
    alert: Option<String>,
    #[serde(rename = "magType")]
    mag_type: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PointGeometry {
    #[serde(default)]
    coordinates: Vec<Option<f64>>,
}

pub struct SeismicCatalogSource {
    transport: Arc<dyn FeedTransport>,
    feed_url: String,
    limiter: RateLimiter,
}

impl SeismicCatalogSource {
    pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
        Self {
            transport,
            feed_url: USGS_DEFAULT_URL.to_string(),
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
                source_name: USGS_NAME.to_string(),
            });
        }
        let body = self.transport.get_text(&self.feed_url).await?;
        parse_feature_collection(&body)
    }
}

#[async_trait]
impl AlertSource for SeismicCatalogSource {
    fn name(&self) -> &str {
        USGS_NAME
    }

    async fn fetch_alerts(&self) -> Vec<AlertRecord> {
        fail_open(USGS_NAME, self.try_fetch()).await
    }
}

/// Parse a FeatureCollection. A broken envelope is an error; a broken
/// feature is skipped.
pub fn parse_feature_collection(body: &str) -> Result<Vec<AlertRecord>> {
    let doc: Value =
        serde_json::from_str(body).map_err(|e| SourceError::Parse(format!("seismic: {e}")))?;
    let features = doc
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| SourceError::Parse("seismic: no features array".to_string()))?;

    Ok(features.iter().filter_map(normalize_feature).collect())
}

fn normalize_feature(raw: &Value) -> Option<AlertRecord> {
    let feature: Feature = match serde_json::from_value(raw.clone()) {
        Ok(f) => f,
        Err(e) => {
            debug!(error = %e, "seismic: skipping malformed feature");
            return None;
        }
    };

    let coords = feature.geometry.as_ref().map(|g| g.coordinates.as_slice())?;
    let (lon, lat) = match coords {
        [Some(lon), Some(lat), ..] => (*lon, *lat),
        _ => {
            debug!(id = ?feature.id, "seismic: skipping feature without coordinates");
            return None;
        }
    };
    let geometry = Geometry::point(lon, lat)?;
    let depth_km = coords.get(2).copied().flatten();

    let native_id = feature.id.clone()?;
    let props = feature.properties;
    let severity = seismic_severity(props.mag);

    let headline = props.title.clone().unwrap_or_else(|| match (props.mag, &props.place) {
        (Some(m), Some(place)) => format!("M {m:.1} - {place}"),
        (Some(m), None) => format!("M {m:.1} earthquake"),
        _ => String::new(),
    });

    let mut payload = BTreeMap::new();
    if let Some(mag) = props.mag {
        payload.insert("magnitude".to_string(), json!(mag));
    }
    if let Some(mag_type) = &props.mag_type {
        payload.insert("magnitudeType".to_string(), json!(mag_type));
    }
    if let Some(depth) = depth_km {
        payload.insert("depthKm".to_string(), json!(depth));
    }
    if let Some(place) = &props.place {
        payload.insert("place".to_string(), json!(place));
    }
    if let Some(url) = &props.url {
        payload.insert("url".to_string(), json!(url));
    }
    if let Some(alert) = &props.alert {
        payload.insert("pagerAlert".to_string(), json!(alert));
    }
    payload.insert("tsunami".to_string(), json!(props.tsunami == Some(1)));
    if let Some(updated) = props.updated.and_then(DateTime::<Utc>::from_timestamp_millis) {
        payload.insert("updatedAt".to_string(), json!(updated.to_rfc3339()));
    }

    Some(
        AlertRecord::builder()
            .id(alert_id(USGS_TAG, &native_id))
            .external_id(native_id)
            .source(USGS_NAME)
            .alert_type(AlertType::Earthquake)
            .severity(severity)
            .headline(hazardsignal_common::headline_or_default(
                Some(&headline),
                AlertType::Earthquake,
            ))
            .description(props.place.clone())
            .geometry(geometry)
            .starts_at(props.time.and_then(DateTime::<Utc>::from_timestamp_millis))
            .region_code(props.place.as_deref().and_then(region_from_place))
            .payload(payload)
            .build(),
    )
}

/// "10 km NE of Ridgecrest, CA" → "CA". Places without a comma have no region.
fn region_from_place(place: &str) -> Option<String> {
    let (_, region) = place.rsplit_once(',')?;
    let region = region.trim();
    (!region.is_empty()).then(|| region.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazardsignal_common::Severity;

    const FEED: &str = r#"{
      "type": "FeatureCollection",
      "metadata": {"title": "USGS All Earthquakes, Past Hour"},
      "features": [
        {
          "type": "Feature",
          "id": "nc75000001",
          "properties": {
            "mag": 5.2, "place": "10 km NE of Berkeley, CA", "time": 1714564800000,
            "updated": 1714565000000, "url": "https://earthquake.usgs.gov/x",
            "title": "M 5.2 - 10 km NE of Berkeley, CA", "tsunami": 0, "alert": "yellow",
            "magType": "mw"
          },
          "geometry": {"type": "Point", "coordinates": [-122.35, 37.8, 8.4]}
        },
        {
          "type": "Feature",
          "id": "ak0001",
          "properties": {"mag": 4.3, "place": "Southern Alaska", "time": 1714564900000},
          "geometry": {"type": "Point", "coordinates": [-150.1, 61.2, 40.0]}
        },
        {
          "type": "Feature",
          "id": "hv0002",
          "properties": {"mag": 2.1, "time": 1714564950000},
          "geometry": {"type": "Point", "coordinates": [null, 19.4, 1.0]}
        },
        {
          "type": "Feature",
          "id": "pr0003",
          "properties": {"mag": 1.2, "time": 1714564960000},
          "geometry": {"type": "Point", "coordinates": ["bad", 18.0]}
        },
        {
          "type": "Feature",
          "id": "us0004",
          "properties": {"mag": null},
          "geometry": {"type": "Point", "coordinates": [170.0, -20.0]}
        }
      ]
    }"#;

    #[test]
    fn parses_and_classifies_features() {
        let alerts = parse_feature_collection(FEED).unwrap();
        assert_eq!(alerts.len(), 3);

        let first = &alerts[0];
        assert_eq!(first.alert_type, AlertType::Earthquake);
        assert_eq!(first.severity, Severity::Severe);
        assert_eq!(first.geometry, Geometry::Point([-122.35, 37.8]));
        assert_eq!(first.external_id.as_deref(), Some("nc75000001"));
        assert_eq!(first.region_code.as_deref(), Some("CA"));
        assert_eq!(first.payload["depthKm"], json!(8.4));
        assert_eq!(first.payload["pagerAlert"], json!("yellow"));
        assert_eq!(
            first.starts_at.unwrap().timestamp_millis(),
            1_714_564_800_000
        );

        assert_eq!(alerts[1].severity, Severity::Moderate);
        assert_eq!(alerts[1].headline, "M 4.3 - Southern Alaska");
        assert_eq!(alerts[1].region_code, None);
    }

    #[test]
    fn skips_features_without_usable_coordinates() {
        let alerts = parse_feature_collection(FEED).unwrap();
        assert!(alerts
            .iter()
            .all(|a| !matches!(a.external_id.as_deref(), Some("hv0002") | Some("pr0003"))));
    }

    #[test]
    fn missing_magnitude_is_minor_with_default_headline() {
        let alerts = parse_feature_collection(FEED).unwrap();
        let last = &alerts[2];
        assert_eq!(last.severity, Severity::Minor);
        assert_eq!(last.headline, "Earthquake alert");
        assert_eq!(last.starts_at, None);
    }

    #[test]
    fn ids_are_stable_across_parses() {
        let a = parse_feature_collection(FEED).unwrap();
        let b = parse_feature_collection(FEED).unwrap();
        let ids_a: Vec<_> = a.iter().map(|r| r.id.clone()).collect();
        let ids_b: Vec<_> = b.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids_a, ids_b);
    }

    #[test]
    fn broken_envelope_is_a_parse_error() {
        assert!(matches!(
            parse_feature_collection("<html>oops</html>"),
            Err(SourceError::Parse(_))
        ));
        assert!(matches!(
            parse_feature_collection(r#"{"type": "FeatureCollection"}"#),
            Err(SourceError::Parse(_))
        ));
    }
}
