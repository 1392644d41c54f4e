use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;
use uuid::Uuid;

// --- Geo Types ---

/// A `[longitude, latitude]` pair in WGS84 degrees.
pub type Position = [f64; 2];

/// True if the position is finite and inside WGS84 bounds.
pub fn is_valid_position(p: &Position) -> bool {
    let [lon, lat] = *p;
    lon.is_finite()
        && lat.is_finite()
        && (-180.0..=180.0).contains(&lon)
        && (-90.0..=90.0).contains(&lat)
}

/// GeoJSON-shaped geometry. Serializes as `{"type": "Point", "coordinates": [lon, lat]}`.
///
/// Build through [`Geometry::point`], [`Geometry::line_string`] or
/// [`Geometry::polygon`], which refuse non-finite or out-of-range coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    LineString(Vec<Position>),
    Polygon(Vec<Vec<Position>>),
}

impl Geometry {
    pub fn point(lon: f64, lat: f64) -> Option<Self> {
        let p = [lon, lat];
        is_valid_position(&p).then_some(Geometry::Point(p))
    }

    /// A line needs at least two valid positions.
    pub fn line_string(positions: Vec<Position>) -> Option<Self> {
        if positions.len() < 2 || !positions.iter().all(is_valid_position) {
            return None;
        }
        Some(Geometry::LineString(positions))
    }

    /// Every ring needs at least three valid positions. Rings are stored as given.
    pub fn polygon(rings: Vec<Vec<Position>>) -> Option<Self> {
        if rings.is_empty()
            || rings
                .iter()
                .any(|r| r.len() < 3 || !r.iter().all(is_valid_position))
        {
            return None;
        }
        Some(Geometry::Polygon(rings))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
        }
    }

    /// All positions in declaration order.
    pub fn positions(&self) -> Vec<Position> {
        match self {
            Geometry::Point(p) => vec![*p],
            Geometry::LineString(ps) => ps.clone(),
            Geometry::Polygon(rings) => rings.iter().flatten().copied().collect(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Geometry::Point(p) => is_valid_position(p),
            Geometry::LineString(ps) => ps.len() >= 2 && ps.iter().all(is_valid_position),
            Geometry::Polygon(rings) => {
                !rings.is_empty()
                    && rings
                        .iter()
                        .all(|r| r.len() >= 3 && r.iter().all(is_valid_position))
            }
        }
    }

    /// Representative position for spatial bucketing.
    ///
    /// Points are their own anchor. Lines and polygons use the mean of their
    /// vertices; a ring's closing vertex (equal to its first) is not counted twice.
    pub fn anchor(&self) -> Position {
        let vertices: Vec<Position> = match self {
            Geometry::Point(p) => return *p,
            Geometry::LineString(ps) => ps.clone(),
            Geometry::Polygon(rings) => rings
                .iter()
                .flat_map(|ring| {
                    let closed = ring.len() > 1 && ring.first() == ring.last();
                    let take = if closed { ring.len() - 1 } else { ring.len() };
                    ring.iter().take(take).copied()
                })
                .collect(),
        };
        if vertices.is_empty() {
            return [0.0, 0.0];
        }
        let n = vertices.len() as f64;
        let (lon, lat) = vertices
            .iter()
            .fold((0.0, 0.0), |(x, y), p| (x + p[0], y + p[1]));
        [lon / n, lat / n]
    }
}

// --- Classification enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertType {
    Earthquake,
    Tsunami,
    Wildfire,
    Hurricane,
    Flood,
    Tornado,
    Volcano,
    Chemical,
    Other,
}

impl AlertType {
    /// Human label used when a feed supplies no headline.
    pub fn label(&self) -> &'static str {
        match self {
            AlertType::Earthquake => "Earthquake",
            AlertType::Tsunami => "Tsunami",
            AlertType::Wildfire => "Wildfire",
            AlertType::Hurricane => "Hurricane",
            AlertType::Flood => "Flood",
            AlertType::Tornado => "Tornado",
            AlertType::Volcano => "Volcano",
            AlertType::Chemical => "Chemical hazard",
            AlertType::Other => "Hazard",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::Earthquake => write!(f, "EARTHQUAKE"),
            AlertType::Tsunami => write!(f, "TSUNAMI"),
            AlertType::Wildfire => write!(f, "WILDFIRE"),
            AlertType::Hurricane => write!(f, "HURRICANE"),
            AlertType::Flood => write!(f, "FLOOD"),
            AlertType::Tornado => write!(f, "TORNADO"),
            AlertType::Volcano => write!(f, "VOLCANO"),
            AlertType::Chemical => write!(f, "CHEMICAL"),
            AlertType::Other => write!(f, "OTHER"),
        }
    }
}

/// Canonical severity. Variant order is the severity order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Minor,
    Moderate,
    Severe,
    Extreme,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Minor => write!(f, "MINOR"),
            Severity::Moderate => write!(f, "MODERATE"),
            Severity::Severe => write!(f, "SEVERE"),
            Severity::Extreme => write!(f, "EXTREME"),
        }
    }
}

// --- Alert Record ---

/// Namespace for alert id derivation. Changing it changes every id.
const ALERT_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a7e_93d4_4b8e_a0f5_1e2d_3c4b_5a69);

/// Deterministic record id for a source tag and the source's native id.
/// Re-fetching the same upstream event yields the same id.
pub fn alert_id(source_tag: &str, native_id: &str) -> String {
    let uuid = Uuid::new_v5(
        &ALERT_ID_NAMESPACE,
        format!("{source_tag}:{native_id}").as_bytes(),
    );
    format!("{source_tag}-{uuid}")
}

/// Trimmed headline, or "<Type> alert" when the feed gave nothing usable.
pub fn headline_or_default(raw: Option<&str>, alert_type: AlertType) -> String {
    match raw.map(str::trim) {
        Some(h) if !h.is_empty() => h.to_string(),
        _ => format!("{} alert", alert_type.label()),
    }
}

/// The canonical alert shape every source produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct AlertRecord {
    #[builder(setter(into))]
    pub id: String,
    #[builder(default, setter(strip_option, into))]
    pub external_id: Option<String>,
    #[builder(setter(into))]
    pub source: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    #[builder(setter(into))]
    pub headline: String,
    #[builder(default)]
    pub description: Option<String>,
    pub geometry: Geometry,
    #[builder(default)]
    pub starts_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub ends_at: Option<DateTime<Utc>>,
    #[builder(default)]
    pub region_code: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub payload: BTreeMap<String, serde_json::Value>,
    /// Attached downstream. The pipeline never sets it.
    #[builder(default)]
    pub safety_score: Option<f64>,
}

impl AlertRecord {
    /// Ongoing means no end time was reported.
    pub fn is_ongoing(&self) -> bool {
        self.ends_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> AlertRecord {
        AlertRecord::builder()
            .id(alert_id("usgs", "nc75000001"))
            .external_id("nc75000001")
            .source("USGS Earthquake Catalog")
            .alert_type(AlertType::Earthquake)
            .severity(Severity::Severe)
            .headline("M 5.2 - 10km NE of Somewhere, CA")
            .geometry(Geometry::point(-122.35, 37.80).unwrap())
            .starts_at(Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()))
            .build()
    }

    #[test]
    fn severity_is_totally_ordered() {
        assert!(Severity::Minor < Severity::Moderate);
        assert!(Severity::Moderate < Severity::Severe);
        assert!(Severity::Severe < Severity::Extreme);
        assert_eq!(
            [Severity::Extreme, Severity::Minor, Severity::Severe]
                .into_iter()
                .max(),
            Some(Severity::Extreme)
        );
    }

    #[test]
    fn alert_id_is_deterministic_per_source() {
        assert_eq!(alert_id("usgs", "abc"), alert_id("usgs", "abc"));
        assert_ne!(alert_id("usgs", "abc"), alert_id("gdacs", "abc"));
        assert!(alert_id("usgs", "abc").starts_with("usgs-"));
    }

    #[test]
    fn point_rejects_non_finite_and_out_of_range() {
        assert!(Geometry::point(f64::NAN, 10.0).is_none());
        assert!(Geometry::point(10.0, f64::INFINITY).is_none());
        assert!(Geometry::point(181.0, 0.0).is_none());
        assert!(Geometry::point(0.0, -91.0).is_none());
        assert!(Geometry::point(-122.35, 37.8).is_some());
    }

    #[test]
    fn line_and_polygon_require_enough_vertices() {
        assert!(Geometry::line_string(vec![[0.0, 0.0]]).is_none());
        assert!(Geometry::line_string(vec![[0.0, 0.0], [1.0, 1.0]]).is_some());
        assert!(Geometry::polygon(vec![vec![[0.0, 0.0], [1.0, 0.0]]]).is_none());
        assert!(Geometry::polygon(vec![]).is_none());
    }

    #[test]
    fn polygon_anchor_ignores_closing_vertex() {
        let square = Geometry::polygon(vec![vec![
            [0.0, 0.0],
            [2.0, 0.0],
            [2.0, 2.0],
            [0.0, 2.0],
            [0.0, 0.0],
        ]])
        .unwrap();
        assert_eq!(square.anchor(), [1.0, 1.0]);
    }

    #[test]
    fn geometry_serializes_geojson_style() {
        let json = serde_json::to_value(Geometry::point(-122.35, 37.8).unwrap()).unwrap();
        assert_eq!(json["type"], "Point");
        assert_eq!(json["coordinates"][0], -122.35);
        assert_eq!(json["coordinates"][1], 37.8);
    }

    #[test]
    fn record_serializes_with_camel_case_contract() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "EARTHQUAKE");
        assert_eq!(json["severity"], "SEVERE");
        assert_eq!(json["externalId"], "nc75000001");
        assert!(json.get("startsAt").is_some());
        assert!(json["safetyScore"].is_null());
    }

    #[test]
    fn headline_falls_back_to_type_label() {
        assert_eq!(headline_or_default(None, AlertType::Flood), "Flood alert");
        assert_eq!(headline_or_default(Some("   "), AlertType::Other), "Hazard alert");
        assert_eq!(headline_or_default(Some(" M 4.1 "), AlertType::Earthquake), "M 4.1");
    }

    #[test]
    fn record_without_end_is_ongoing() {
        assert!(sample().is_ongoing());
    }
}
