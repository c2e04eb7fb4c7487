//! Historical hourly weather for the pipeline.
//!
//! [`WeatherArchive`] is the seam stages depend on; [`OpenMeteoArchive`] is
//! the HTTP implementation backed by the Open-Meteo archive API.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::NaiveDate;
use tw_core::models::{DateRange, WeatherObservation};
use tw_core::settings::PipelineConfig;

pub mod archive;
pub mod error;

pub use archive::{normalize, ArchiveResponse, OpenMeteoArchive};
pub use error::WeatherError;

/// Hourly variables requested from the archive.
pub const HOURLY_VARIABLES: &str = "temperature_2m,precipitation,weathercode";

/// Parameters of one archive query.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timezone: String,
}

impl WeatherRequest {
    /// Request covering every calendar day touched by `range`.
    pub fn for_range(config: &PipelineConfig, range: &DateRange) -> Self {
        Self {
            latitude: config.latitude,
            longitude: config.longitude,
            start_date: range.start.date(),
            end_date: range.end.date(),
            timezone: config.timezone.clone(),
        }
    }

    /// Query string pairs in the order the archive documents them.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", self.latitude.to_string()),
            ("longitude", self.longitude.to_string()),
            ("start_date", self.start_date.format("%Y-%m-%d").to_string()),
            ("end_date", self.end_date.format("%Y-%m-%d").to_string()),
            ("hourly", HOURLY_VARIABLES.to_string()),
            ("timezone", self.timezone.clone()),
        ]
    }
}

#[async_trait]
pub trait WeatherArchive: Send + Sync + Debug {
    /// Hourly observations for the request, ascending by timestamp.
    async fn hourly(&self, request: &WeatherRequest) -> Result<Vec<WeatherObservation>, WeatherError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tw_core::time_utils::parse_timestamp;

    #[test]
    fn test_request_covers_whole_days() {
        let range = DateRange {
            start: parse_timestamp("2024-01-15 10:12:00").unwrap(),
            end: parse_timestamp("2024-02-01 23:59:59").unwrap(),
        };
        let req = WeatherRequest::for_range(&PipelineConfig::default(), &range);
        assert_eq!(req.start_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(req.end_date, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(req.timezone, "Europe/Istanbul");
    }

    #[test]
    fn test_query_pairs() {
        let range = DateRange {
            start: parse_timestamp("2024-01-15 10:12:00").unwrap(),
            end: parse_timestamp("2024-01-16 08:00:00").unwrap(),
        };
        let pairs = WeatherRequest::for_range(&PipelineConfig::default(), &range).query_pairs();
        let get = |k: &str| pairs.iter().find(|(key, _)| *key == k).map(|(_, v)| v.as_str());

        assert_eq!(get("latitude"), Some("41.0082"));
        assert_eq!(get("longitude"), Some("28.9784"));
        assert_eq!(get("start_date"), Some("2024-01-15"));
        assert_eq!(get("end_date"), Some("2024-01-16"));
        assert_eq!(get("hourly"), Some("temperature_2m,precipitation,weathercode"));
        assert_eq!(get("timezone"), Some("Europe/Istanbul"));
    }
}
