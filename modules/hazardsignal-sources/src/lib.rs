pub mod classify;
pub mod error;
pub mod rate_limit;
pub mod services;
pub mod source;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod transport;
mod xml_scan;

pub use error::{Result, SourceError};
pub use hazardsignal_common::types::{AlertRecord, AlertType, Geometry, Severity};
pub use rate_limit::RateLimiter;
pub use services::bulletin::HazardBulletinSource;
pub use services::fire::SatelliteFireSource;
pub use services::seismic::SeismicCatalogSource;
pub use services::synthetic::SyntheticSource;
pub use services::tracker::OpenEventTrackerSource;
pub use source::AlertSource;
pub use transport::{FeedTransport, HttpTransport};
