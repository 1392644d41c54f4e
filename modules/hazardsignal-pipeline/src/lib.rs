pub mod adapter_set;
pub mod aggregator;
pub mod dedup;
pub mod dispatch;

pub use adapter_set::AdapterSet;
pub use aggregator::{AggregationRun, Aggregator, AggregatorSettings, SourceOutcome, SourceReport};
pub use dedup::{CoordinatePrecision, Deduplicator};
pub use dispatch::{AlertDispatcher, LogDispatcher, MockDispatcher, WebhookDispatcher};
