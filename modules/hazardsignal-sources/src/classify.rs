//! Classification rules: native severity signals → canonical enums.
//!
//! Every function here is pure. Thresholds are adapter-specific; each adapter
//! calls the rules for its own feed and nothing else.

use hazardsignal_common::{AlertType, Severity};

// ---------------------------------------------------------------------------
// Seismic catalog
// ---------------------------------------------------------------------------

pub const SEISMIC_SEVERE_MAGNITUDE: f64 = 5.0;
pub const SEISMIC_MODERATE_MAGNITUDE: f64 = 4.0;

/// Magnitude ≥ 5.0 → SEVERE, ≥ 4.0 → MODERATE, otherwise (or unknown) MINOR.
pub fn seismic_severity(magnitude: Option<f64>) -> Severity {
    match magnitude {
        Some(m) if m >= SEISMIC_SEVERE_MAGNITUDE => Severity::Severe,
        Some(m) if m >= SEISMIC_MODERATE_MAGNITUDE => Severity::Moderate,
        _ => Severity::Minor,
    }
}

// ---------------------------------------------------------------------------
// Satellite fire detections
// ---------------------------------------------------------------------------

pub const FIRE_SEVERE_BRIGHTNESS: f64 = 400.0;
pub const FIRE_MODERATE_BRIGHTNESS: f64 = 350.0;

/// Detection confidence. VIIRS reports `l`/`n`/`h`, MODIS a 0–100 percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireConfidence {
    Low,
    Nominal,
    High,
    Unknown,
}

impl FireConfidence {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_lowercase();
        match raw.as_str() {
            "h" | "high" => FireConfidence::High,
            "n" | "nominal" => FireConfidence::Nominal,
            "l" | "low" => FireConfidence::Low,
            other => match other.parse::<f64>() {
                Ok(pct) if pct >= 80.0 => FireConfidence::High,
                Ok(pct) if pct >= 30.0 => FireConfidence::Nominal,
                Ok(_) => FireConfidence::Low,
                Err(_) => FireConfidence::Unknown,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FireConfidence::Low => "low",
            FireConfidence::Nominal => "nominal",
            FireConfidence::High => "high",
            FireConfidence::Unknown => "unknown",
        }
    }
}

/// High confidence or brightness > 400 K → SEVERE; nominal or > 350 K → MODERATE.
pub fn fire_severity(confidence: FireConfidence, brightness: Option<f64>) -> Severity {
    let brightness = brightness.unwrap_or(0.0);
    if confidence == FireConfidence::High || brightness > FIRE_SEVERE_BRIGHTNESS {
        Severity::Severe
    } else if confidence == FireConfidence::Nominal || brightness > FIRE_MODERATE_BRIGHTNESS {
        Severity::Moderate
    } else {
        Severity::Minor
    }
}

// ---------------------------------------------------------------------------
// Multi-hazard bulletins
// ---------------------------------------------------------------------------

/// Textual alert-level token. Unrecognized tokens return `None`.
pub fn alert_level_severity(token: &str) -> Option<Severity> {
    match token.trim().to_lowercase().as_str() {
        "red" => Some(Severity::Extreme),
        "orange" => Some(Severity::Severe),
        "green" => Some(Severity::Minor),
        _ => None,
    }
}

/// Severity assumed for a hazard type when the feed says nothing better.
pub fn default_severity(alert_type: AlertType) -> Severity {
    match alert_type {
        AlertType::Tsunami | AlertType::Hurricane => Severity::Severe,
        AlertType::Earthquake
        | AlertType::Flood
        | AlertType::Volcano
        | AlertType::Wildfire
        | AlertType::Tornado
        | AlertType::Chemical => Severity::Moderate,
        AlertType::Other => Severity::Minor,
    }
}

/// A recognized alert level wins; otherwise the type default.
pub fn bulletin_severity(alert_level: Option<&str>, alert_type: AlertType) -> Severity {
    alert_level
        .and_then(alert_level_severity)
        .unwrap_or_else(|| default_severity(alert_type))
}

/// Keyword groups in priority order. First group with any hit wins.
const TYPE_KEYWORDS: &[(AlertType, &[&str])] = &[
    (AlertType::Earthquake, &["earthquake"]),
    (AlertType::Tsunami, &["tsunami"]),
    (AlertType::Hurricane, &["hurricane", "cyclone", "typhoon"]),
    (AlertType::Flood, &["flood"]),
    (AlertType::Volcano, &["volcano", "volcanic", "eruption"]),
];

/// Infer a hazard type from free text. A bulletin that mentions several
/// hazards still gets exactly one type.
pub fn infer_type(title: &str, description: &str) -> AlertType {
    let text = format!("{title} {description}").to_lowercase();
    TYPE_KEYWORDS
        .iter()
        .find(|(_, words)| words.iter().any(|w| text.contains(w)))
        .map(|(t, _)| *t)
        .unwrap_or(AlertType::Other)
}

/// GDACS-style two-letter event codes.
pub fn event_code_type(code: &str) -> Option<AlertType> {
    match code.trim().to_uppercase().as_str() {
        "EQ" => Some(AlertType::Earthquake),
        "TS" => Some(AlertType::Tsunami),
        "TC" => Some(AlertType::Hurricane),
        "FL" => Some(AlertType::Flood),
        "VO" => Some(AlertType::Volcano),
        "WF" => Some(AlertType::Wildfire),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Open-event tracker
// ---------------------------------------------------------------------------

/// Category id → type. Unknown categories fall through to keyword inference.
pub fn category_type(category_id: &str) -> Option<AlertType> {
    match category_id {
        "earthquakes" => Some(AlertType::Earthquake),
        "wildfires" => Some(AlertType::Wildfire),
        "severeStorms" => Some(AlertType::Hurricane),
        "floods" => Some(AlertType::Flood),
        "volcanoes" => Some(AlertType::Volcano),
        "manmade" => Some(AlertType::Chemical),
        _ => None,
    }
}

/// Magnitude-based severity when the tracker reports a known unit, otherwise
/// the type default.
pub fn tracker_severity(alert_type: AlertType, magnitude: Option<(f64, &str)>) -> Severity {
    match magnitude {
        Some((value, unit)) if unit.eq_ignore_ascii_case("kts") => match value {
            v if v >= 96.0 => Severity::Extreme,
            v if v >= 64.0 => Severity::Severe,
            _ => Severity::Moderate,
        },
        Some((value, unit)) if unit.eq_ignore_ascii_case("acres") => match value {
            v if v >= 100_000.0 => Severity::Extreme,
            v if v >= 10_000.0 => Severity::Severe,
            _ => Severity::Moderate,
        },
        _ => default_severity(alert_type),
    }
}
