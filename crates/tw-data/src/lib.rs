//! Data layer of the TikTok × weather pipeline.
//!
//! Extracts records from raw export files, persists the intermediate CSV
//! tables, aggregates activity per hour, joins it with weather and computes
//! the summary statistics. Also loads annual daily weather files.

pub mod aggregator;
pub mod analysis;
pub mod annual;
pub mod extractor;
pub mod merge;
pub mod tables;

pub use tw_core as core;
