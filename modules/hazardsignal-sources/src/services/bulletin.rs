// Multi-hazard bulletin adapter: GDACS-style RSS.
//
// Items carry a free-text title/description plus namespaced alert-level,
// event-type, country and point tags. Type comes from the event code when
// present, otherwise from keywords; severity from the alert level, otherwise
// from the type default.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hazardsignal_common::{alert_id, headline_or_default, AlertRecord, Geometry};
use serde_json::json;
use tracing::debug;

use crate::classify::{bulletin_severity, event_code_type, infer_type};
use crate::error::{Result, SourceError};
use crate::rate_limit::RateLimiter;
use crate::source::{fail_open, AlertSource};
use crate::transport::FeedTransport;
use crate::xml_scan;

pub const GDACS_TAG: &str = "gdacs";
pub const GDACS_NAME: &str = "GDACS Disaster Alerts";
pub const GDACS_DEFAULT_URL: &str = "https://www.gdacs.org/xml/rss.xml";

pub struct HazardBulletinSource {
    transport: Arc<dyn FeedTransport>,
    feed_url: String,
    limiter: RateLimiter,
}

impl HazardBulletinSource {
    pub fn new(transport: Arc<dyn FeedTransport>) -> Self {
        Self {
            transport,
            feed_url: GDACS_DEFAULT_URL.to_string(),
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
                source_name: GDACS_NAME.to_string(),
            });
        }
        let body = self.transport.get_text(&self.feed_url).await?;
        parse_rss(&body)
    }
}

#[async_trait]
impl AlertSource for HazardBulletinSource {
    fn name(&self) -> &str {
        GDACS_NAME
    }

    async fn fetch_alerts(&self) -> Vec<AlertRecord> {
        fail_open(GDACS_NAME, self.try_fetch()).await
    }
}

/// Parse an RSS bulletin. Anything that is not an RSS envelope is an error.
pub fn parse_rss(body: &str) -> Result<Vec<AlertRecord>> {
    if !xml_scan::looks_like_feed(body) {
        return Err(SourceError::Parse(
            "bulletin: response is not an RSS document".to_string(),
        ));
    }
    Ok(xml_scan::items(body)
        .into_iter()
        .filter_map(normalize_item)
        .collect())
}

fn normalize_item(item: &str) -> Option<AlertRecord> {
    let title = xml_scan::tag_text(item, "title");
    let description = xml_scan::tag_text(item, "description");

    let geometry = match item_point(item) {
        Some(g) => g,
        None => {
            debug!(title = ?title, "bulletin: skipping item without coordinates");
            return None;
        }
    };

    let event_code = xml_scan::tag_text(item, "gdacs:eventtype");
    let alert_type = event_code
        .as_deref()
        .and_then(event_code_type)
        .unwrap_or_else(|| {
            infer_type(
                title.as_deref().unwrap_or_default(),
                description.as_deref().unwrap_or_default(),
            )
        });
    let alert_level = xml_scan::tag_text(item, "gdacs:alertlevel");
    let severity = bulletin_severity(alert_level.as_deref(), alert_type);

    let guid = xml_scan::tag_text(item, "guid");
    let link = xml_scan::tag_text(item, "link");
    let event_id = xml_scan::tag_text(item, "gdacs:eventid");
    let pub_date = xml_scan::tag_text(item, "pubDate").and_then(|d| parse_rfc2822(&d));
    let starts_at = xml_scan::tag_text(item, "gdacs:fromdate")
        .and_then(|d| parse_rfc2822(&d))
        .or(pub_date);

    let native_id = guid
        .clone()
        .or_else(|| {
            event_id
                .as_ref()
                .map(|id| format!("{}{id}", event_code.as_deref().unwrap_or_default()))
        })
        .or_else(|| link.clone())
        .or_else(|| {
            title
                .as_deref()
                .map(|t| title_native_id(t, &geometry, starts_at))
        })?;
    let is_current = xml_scan::tag_text(item, "gdacs:iscurrent")
        .map(|v| !v.eq_ignore_ascii_case("false"))
        .unwrap_or(true);
    let ends_at = if is_current {
        None
    } else {
        xml_scan::tag_text(item, "gdacs:todate").and_then(|d| parse_rfc2822(&d))
    };

    let mut payload = BTreeMap::new();
    if let Some(level) = &alert_level {
        payload.insert("alertLevel".to_string(), json!(level));
    }
    if let Some(code) = &event_code {
        payload.insert("eventType".to_string(), json!(code));
    }
    if let Some(id) = &event_id {
        payload.insert("eventId".to_string(), json!(id));
    }
    if let Some(sev) = xml_scan::tag_text(item, "gdacs:severity") {
        payload.insert("severityText".to_string(), json!(sev));
    }
    if let Some(value) = xml_scan::tag_attr(item, "gdacs:severity", "value")
        .and_then(|v| v.parse::<f64>().ok())
    {
        payload.insert("severityValue".to_string(), json!(value));
    }
    if let Some(country) = xml_scan::tag_text(item, "gdacs:country") {
        payload.insert("country".to_string(), json!(country));
    }
    if let Some(link) = &link {
        payload.insert("link".to_string(), json!(link));
    }

    Some(
        AlertRecord::builder()
            .id(alert_id(GDACS_TAG, &native_id))
            .external_id(native_id)
            .source(GDACS_NAME)
            .alert_type(alert_type)
            .severity(severity)
            .headline(headline_or_default(title.as_deref(), alert_type))
            .description(description)
            .geometry(geometry)
            .starts_at(starts_at)
            .ends_at(ends_at)
            .region_code(xml_scan::tag_text(item, "gdacs:iso3"))
            .payload(payload)
            .build(),
    )
}

/// Last-resort id for items with nothing but a title. Titles repeat across
/// events ("Green flood alert in India"), so the anchor and start hour are
/// folded in.
fn title_native_id(
    title: &str,
    geometry: &Geometry,
    starts_at: Option<DateTime<Utc>>,
) -> String {
    let [lon, lat] = geometry.anchor();
    match starts_at {
        Some(ts) => format!("{title}|{lon},{lat}|{}", ts.format("%Y-%m-%dT%H")),
        None => format!("{title}|{lon},{lat}"),
    }
}

/// `geo:lat`/`geo:long` first, then `georss:point` ("lat lon").
fn item_point(item: &str) -> Option<Geometry> {
    let lat = xml_scan::tag_text(item, "geo:lat").and_then(|v| v.parse::<f64>().ok());
    let lon = xml_scan::tag_text(item, "geo:long").and_then(|v| v.parse::<f64>().ok());
    if let (Some(lat), Some(lon)) = (lat, lon) {
        return Geometry::point(lon, lat);
    }

    let point = xml_scan::tag_text(item, "georss:point")?;
    let mut parts = point.split_whitespace().map(str::parse::<f64>);
    match (parts.next(), parts.next()) {
        (Some(Ok(lat)), Some(Ok(lon))) => Geometry::point(lon, lat),
        _ => None,
    }
}

fn parse_rfc2822(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazardsignal_common::{AlertType, Severity};

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:gdacs="http://www.gdacs.org" xmlns:geo="http://www.w3.org/2003/01/geo/wgs84_pos#" xmlns:georss="http://www.georss.org/georss">
<channel>
  <title>GDACS RSS information</title>
  <item>
    <title>Orange earthquake alert (Magnitude 6.1M, Depth:10km) in Japan</title>
    <description><![CDATA[On 5/1/2024, an earthquake of magnitude 6.1 occurred.]]></description>
    <link>https://www.gdacs.org/report.aspx?eventtype=EQ&amp;eventid=1400001</link>
    <guid isPermaLink="false">EQ1400001</guid>
    <pubDate>Wed, 01 May 2024 12:10:00 GMT</pubDate>
    <gdacs:fromdate>Wed, 01 May 2024 12:00:00 GMT</gdacs:fromdate>
    <gdacs:todate>Wed, 01 May 2024 12:00:00 GMT</gdacs:todate>
    <gdacs:iscurrent>true</gdacs:iscurrent>
    <gdacs:alertlevel>Orange</gdacs:alertlevel>
    <gdacs:eventtype>EQ</gdacs:eventtype>
    <gdacs:eventid>1400001</gdacs:eventid>
    <gdacs:severity unit="M" value="6.1">Magnitude 6.1M, Depth:10km</gdacs:severity>
    <gdacs:iso3>JPN</gdacs:iso3>
    <geo:Point><geo:lat>38.3</geo:lat><geo:long>142.4</geo:long></geo:Point>
  </item>
  <item>
    <title>Tsunami warning issued for coastal areas</title>
    <guid>TS-77</guid>
    <pubDate>Wed, 01 May 2024 13:00:00 GMT</pubDate>
    <georss:point>-8.5 115.2</georss:point>
  </item>
  <item>
    <title>Red flood alert in Bangladesh</title>
    <guid>FL1100</guid>
    <gdacs:alertlevel>Red</gdacs:alertlevel>
    <gdacs:eventtype>FL</gdacs:eventtype>
    <gdacs:iscurrent>false</gdacs:iscurrent>
    <gdacs:fromdate>Mon, 22 Apr 2024 00:00:00 GMT</gdacs:fromdate>
    <gdacs:todate>Tue, 30 Apr 2024 00:00:00 GMT</gdacs:todate>
    <georss:point>23.7 90.4</georss:point>
  </item>
  <item>
    <title>Drought in region without coordinates</title>
    <guid>DR9</guid>
  </item>
</channel>
</rss>"#;

    #[test]
    fn parses_items_in_document_order() {
        let alerts = parse_rss(RSS).unwrap();
        assert_eq!(alerts.len(), 3);
        assert_eq!(alerts[0].external_id.as_deref(), Some("EQ1400001"));
        assert_eq!(alerts[1].external_id.as_deref(), Some("TS-77"));
        assert_eq!(alerts[2].external_id.as_deref(), Some("FL1100"));
    }

    #[test]
    fn alert_level_and_event_code_classify() {
        let alerts = parse_rss(RSS).unwrap();
        assert_eq!(alerts[0].alert_type, AlertType::Earthquake);
        assert_eq!(alerts[0].severity, Severity::Severe);
        assert_eq!(alerts[2].alert_type, AlertType::Flood);
        assert_eq!(alerts[2].severity, Severity::Extreme);
    }

    #[test]
    fn keyword_type_and_type_default_severity() {
        let alerts = parse_rss(RSS).unwrap();
        assert_eq!(alerts[1].alert_type, AlertType::Tsunami);
        assert_eq!(alerts[1].severity, Severity::Severe);
    }

    #[test]
    fn geo_tags_are_read_lat_then_lon() {
        let alerts = parse_rss(RSS).unwrap();
        assert_eq!(alerts[0].geometry, Geometry::Point([142.4, 38.3]));
        assert_eq!(alerts[1].geometry, Geometry::Point([115.2, -8.5]));
    }

    #[test]
    fn dates_region_and_payload() {
        let alerts = parse_rss(RSS).unwrap();
        let eq = &alerts[0];
        assert_eq!(eq.starts_at.unwrap().to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert!(eq.is_ongoing());
        assert_eq!(eq.region_code.as_deref(), Some("JPN"));
        assert_eq!(eq.payload["severityValue"], json!(6.1));
        assert_eq!(
            eq.payload["link"],
            json!("https://www.gdacs.org/report.aspx?eventtype=EQ&eventid=1400001")
        );

        let flood = &alerts[2];
        assert_eq!(flood.ends_at.unwrap().to_rfc3339(), "2024-04-30T00:00:00+00:00");
    }

    #[test]
    fn pub_date_is_the_start_fallback() {
        let alerts = parse_rss(RSS).unwrap();
        assert_eq!(
            alerts[1].starts_at.unwrap().to_rfc3339(),
            "2024-05-01T13:00:00+00:00"
        );
    }

    #[test]
    fn title_only_items_with_a_shared_title_get_distinct_ids() {
        let body = r#"<rss><channel>
  <item>
    <title>Green flood alert in India</title>
    <pubDate>Wed, 01 May 2024 06:00:00 GMT</pubDate>
    <georss:point>26.1 91.7</georss:point>
  </item>
  <item>
    <title>Green flood alert in India</title>
    <pubDate>Wed, 01 May 2024 06:00:00 GMT</pubDate>
    <georss:point>19.0 72.8</georss:point>
  </item>
  <item>
    <title>Green flood alert in India</title>
    <pubDate>Thu, 02 May 2024 06:00:00 GMT</pubDate>
    <georss:point>26.1 91.7</georss:point>
  </item>
</channel></rss>"#;
        let alerts = parse_rss(body).unwrap();
        assert_eq!(alerts.len(), 3);
        assert_ne!(alerts[0].id, alerts[1].id);
        assert_ne!(alerts[0].id, alerts[2].id);
        assert_ne!(alerts[1].id, alerts[2].id);
        assert_eq!(
            alerts[0].external_id.as_deref(),
            Some("Green flood alert in India|91.7,26.1|2024-05-01T06")
        );

        // Same item fetched again keeps its id.
        assert_eq!(parse_rss(body).unwrap()[0].id, alerts[0].id);
    }

    #[test]
    fn non_rss_body_is_a_parse_error() {
        assert!(matches!(
            parse_rss("<html><body>Service Unavailable</body></html>"),
            Err(SourceError::Parse(_))
        ));
    }

    #[test]
    fn empty_channel_is_empty_not_an_error() {
        let alerts = parse_rss("<rss><channel><title>x</title></channel></rss>").unwrap();
        assert!(alerts.is_empty());
    }
}
