use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use hazardsignal_common::{Config, HazardSignalError};
use hazardsignal_sources::{
    AlertSource, FeedTransport, HazardBulletinSource, OpenEventTrackerSource,
    SatelliteFireSource, SeismicCatalogSource, SyntheticSource,
};

/// Which adapters a pipeline polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdapterSet {
    /// Offline demo data only.
    Synthetic,
    Seismic,
    SatelliteFire,
    Bulletin,
    OpenEvents,
    /// Every production adapter.
    All,
}

impl AdapterSet {
    /// Instantiate the selected adapters. Order here is dedup priority:
    /// earlier adapters win when two records describe the same event.
    pub fn build(
        &self,
        config: &Config,
        transport: Arc<dyn FeedTransport>,
    ) -> Vec<Arc<dyn AlertSource>> {
        match self {
            AdapterSet::Synthetic => vec![Arc::new(SyntheticSource::new())],
            AdapterSet::Seismic => vec![seismic(config, transport)],
            AdapterSet::SatelliteFire => vec![fire(config, transport)],
            AdapterSet::Bulletin => vec![bulletin(config, transport)],
            AdapterSet::OpenEvents => vec![events(config, transport)],
            AdapterSet::All => vec![
                seismic(config, transport.clone()),
                bulletin(config, transport.clone()),
                events(config, transport.clone()),
                fire(config, transport),
            ],
        }
    }
}

fn seismic(config: &Config, transport: Arc<dyn FeedTransport>) -> Arc<dyn AlertSource> {
    let mut source = SeismicCatalogSource::new(transport);
    if let Some(url) = &config.usgs_feed_url {
        source = source.with_feed_url(url.as_str());
    }
    Arc::new(source)
}

fn fire(config: &Config, transport: Arc<dyn FeedTransport>) -> Arc<dyn AlertSource> {
    let mut source = SatelliteFireSource::new(transport, config.firms_map_key.clone());
    if let Some(url) = &config.firms_feed_url {
        source = source.with_feed_url(url.as_str());
    }
    Arc::new(source)
}

fn bulletin(config: &Config, transport: Arc<dyn FeedTransport>) -> Arc<dyn AlertSource> {
    let mut source = HazardBulletinSource::new(transport);
    if let Some(url) = &config.gdacs_feed_url {
        source = source.with_feed_url(url.as_str());
    }
    Arc::new(source)
}

fn events(config: &Config, transport: Arc<dyn FeedTransport>) -> Arc<dyn AlertSource> {
    let mut source = OpenEventTrackerSource::new(transport);
    if let Some(url) = &config.eonet_feed_url {
        source = source.with_feed_url(url.as_str());
    }
    Arc::new(source)
}

impl FromStr for AdapterSet {
    type Err = HazardSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" | "offline" => Ok(AdapterSet::Synthetic),
            "seismic" | "usgs" => Ok(AdapterSet::Seismic),
            "fire" | "firms" | "satellite-fire" => Ok(AdapterSet::SatelliteFire),
            "bulletin" | "gdacs" => Ok(AdapterSet::Bulletin),
            "events" | "eonet" | "open-events" => Ok(AdapterSet::OpenEvents),
            "all" | "production" => Ok(AdapterSet::All),
            other => Err(HazardSignalError::Config(format!(
                "unknown adapter set {other:?} \
                 (expected synthetic, seismic, fire, bulletin, events or all)"
            ))),
        }
    }
}

impl fmt::Display for AdapterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AdapterSet::Synthetic => "synthetic",
            AdapterSet::Seismic => "seismic",
            AdapterSet::SatelliteFire => "fire",
            AdapterSet::Bulletin => "bulletin",
            AdapterSet::OpenEvents => "events",
            AdapterSet::All => "all",
        };
        write!(f, "{s}")
    }
}
