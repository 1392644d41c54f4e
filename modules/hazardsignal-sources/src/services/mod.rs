// Feed adapters. Each one knows how to fetch exactly one external feed and
// normalize it into AlertRecords. No shared state between adapters.

pub mod bulletin;
pub mod fire;
pub mod seismic;
pub mod synthetic;
pub mod tracker;
