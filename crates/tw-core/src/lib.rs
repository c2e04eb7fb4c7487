//! Shared building blocks for the TikTok × weather pipeline.
//!
//! Holds the record types every stage exchanges, the error type, the fixed
//! weather-code table, time and statistics helpers, and CLI/config settings.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod stats;
pub mod time_utils;
pub mod weather_codes;

pub use error::{Error, Result};
