use std::env;

use tracing::info;

use crate::error::HazardSignalError;

const DEFAULT_ADAPTERS: &str = "all";
const DEFAULT_ADAPTER_TIMEOUT_SECS: u64 = 20;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // Adapter selection
    pub adapters: String,

    // Feed credentials and endpoint overrides
    pub firms_map_key: Option<String>,
    pub usgs_feed_url: Option<String>,
    pub firms_feed_url: Option<String>,
    pub gdacs_feed_url: Option<String>,
    pub eonet_feed_url: Option<String>,

    // Aggregation
    pub adapter_timeout_secs: u64,
    /// Geohash cell length for dedup. `None` compares exact coordinates.
    pub dedup_geohash_precision: Option<usize>,

    // Dispatch
    pub dispatch_webhook_url: Option<String>,
    pub poll_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adapters: DEFAULT_ADAPTERS.to_string(),
            firms_map_key: None,
            usgs_feed_url: None,
            firms_feed_url: None,
            gdacs_feed_url: None,
            eonet_feed_url: None,
            adapter_timeout_secs: DEFAULT_ADAPTER_TIMEOUT_SECS,
            dedup_geohash_precision: None,
            dispatch_webhook_url: None,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, HazardSignalError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HazardSignalError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let dedup_geohash_precision = match get("DEDUP_GEOHASH_PRECISION") {
            Some(raw) => {
                let n: usize = parse_number("DEDUP_GEOHASH_PRECISION", &raw)?;
                if !(1..=12).contains(&n) {
                    return Err(HazardSignalError::Config(format!(
                        "DEDUP_GEOHASH_PRECISION must be between 1 and 12, got {n}"
                    )));
                }
                Some(n)
            }
            None => None,
        };

        let adapter_timeout_secs = match get("ADAPTER_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = parse_number("ADAPTER_TIMEOUT_SECS", &raw)?;
                if secs == 0 {
                    return Err(HazardSignalError::Config(
                        "ADAPTER_TIMEOUT_SECS must be at least 1".to_string(),
                    ));
                }
                secs
            }
            None => DEFAULT_ADAPTER_TIMEOUT_SECS,
        };

        Ok(Self {
            adapters: get("HAZARD_ADAPTERS").unwrap_or_else(|| DEFAULT_ADAPTERS.to_string()),
            firms_map_key: get("FIRMS_MAP_KEY"),
            usgs_feed_url: get("USGS_FEED_URL"),
            firms_feed_url: get("FIRMS_FEED_URL"),
            gdacs_feed_url: get("GDACS_FEED_URL"),
            eonet_feed_url: get("EONET_FEED_URL"),
            adapter_timeout_secs,
            dedup_geohash_precision,
            dispatch_webhook_url: get("DISPATCH_WEBHOOK_URL"),
            poll_interval_secs: match get("POLL_INTERVAL_SECS") {
                Some(raw) => parse_number("POLL_INTERVAL_SECS", &raw)?,
                None => DEFAULT_POLL_INTERVAL_SECS,
            },
        })
    }

    /// Log the active configuration with credentials masked.
    pub fn log_redacted(&self) {
        info!(
            adapters = self.adapters.as_str(),
            firms_map_key = redact(self.firms_map_key.as_deref()),
            usgs_feed_url = self.usgs_feed_url.as_deref().unwrap_or("(default)"),
            firms_feed_url = self.firms_feed_url.as_deref().unwrap_or("(default)"),
            gdacs_feed_url = self.gdacs_feed_url.as_deref().unwrap_or("(default)"),
            eonet_feed_url = self.eonet_feed_url.as_deref().unwrap_or("(default)"),
            adapter_timeout_secs = self.adapter_timeout_secs,
            dedup_geohash_precision = ?self.dedup_geohash_precision,
            dispatch_webhook = self.dispatch_webhook_url.is_some(),
            poll_interval_secs = self.poll_interval_secs,
            "Configuration loaded"
        );
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, HazardSignalError> {
    raw.trim()
        .parse()
        .map_err(|_| HazardSignalError::Config(format!("{key} must be a number, got {raw:?}")))
}

fn redact(secret: Option<&str>) -> &'static str {
    match secret {
        Some(_) => "[set]",
        None => "[unset]",
    }
}
