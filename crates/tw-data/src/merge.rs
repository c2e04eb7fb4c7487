//! Inner join of hourly activity with hourly weather, plus derived fields.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use tracing::{info, warn};
use tw_core::formatting::format_number;
use tw_core::models::{DateRange, SourceType, WeatherObservation};
use tw_core::time_utils::{format_timestamp, is_weekend};
use tw_core::weather_codes;

use crate::aggregator::HourlyTable;

// ── MergedRow ─────────────────────────────────────────────────────────────────

/// One hour present in both the activity table and the weather table.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub timestamp: NaiveDateTime,
    /// Aligned with [`MergedTable::sources`].
    pub counts: Vec<u64>,
    pub temperature: f64,
    pub precipitation: f64,
    pub weather_code: i32,
    /// `None` when the code is not in the fixed table.
    pub weather_description: Option<&'static str>,
    pub hour: u32,
    pub day_of_week: Weekday,
    pub is_weekend: bool,
    pub total_activity: u64,
}

impl MergedRow {
    /// Join one hour of counts with its weather and compute derived fields.
    pub fn new(timestamp: NaiveDateTime, counts: Vec<u64>, weather: &WeatherObservation) -> Self {
        let day_of_week = timestamp.weekday();
        let total_activity = counts.iter().sum();
        Self {
            timestamp,
            counts,
            temperature: weather.temperature,
            precipitation: weather.precipitation,
            weather_code: weather.weather_code,
            weather_description: weather_codes::describe(weather.weather_code),
            hour: timestamp.hour(),
            day_of_week,
            is_weekend: is_weekend(day_of_week),
            total_activity,
        }
    }
}

// ── MergedTable ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    pub sources: Vec<SourceType>,
    /// Ascending by timestamp.
    pub rows: Vec<MergedRow>,
}

impl MergedTable {
    pub fn count_columns(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.count_column()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Values of the count column at `idx`, as floats.
    pub fn count_values(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r.counts[idx] as f64).collect()
    }

    pub fn totals(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.total_activity as f64).collect()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.temperature).collect()
    }

    pub fn precipitations(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.precipitation).collect()
    }

    pub fn date_range(&self) -> Option<DateRange> {
        DateRange::covering(self.rows.iter().map(|r| r.timestamp))
    }

    /// Summary logged after a merge.
    pub fn summary(&self) -> MergeSummary {
        let column_totals = self
            .sources
            .iter()
            .enumerate()
            .map(|(idx, source)| {
                let total = self.rows.iter().map(|r| r.counts[idx]).sum();
                (source.count_column(), total)
            })
            .collect();
        MergeSummary {
            date_range: self.date_range(),
            total_hours: self.rows.len(),
            column_totals,
        }
    }
}

// ── MergeSummary ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct MergeSummary {
    pub date_range: Option<DateRange>,
    pub total_hours: usize,
    /// `(count column, sum over all hours)` in source order.
    pub column_totals: Vec<(String, u64)>,
}

impl MergeSummary {
    pub fn log(&self) {
        match self.date_range {
            Some(range) => info!(
                "Date range: {} to {}",
                format_timestamp(&range.start),
                format_timestamp(&range.end)
            ),
            None => info!("Date range: empty"),
        }
        info!("Total hours: {}", self.total_hours);
        for (column, total) in &self.column_totals {
            info!("Total {}: {}", column, format_number(*total as f64, 0));
        }
    }
}

// ── merge ─────────────────────────────────────────────────────────────────────

/// Inner-join `activity` with `weather` on the hour timestamp.
///
/// Hours missing from either side are dropped and the drop counts logged.
/// When the weather table repeats a timestamp the first observation wins.
pub fn merge(activity: &HourlyTable, weather: &[WeatherObservation]) -> MergedTable {
    let mut by_hour: BTreeMap<NaiveDateTime, &WeatherObservation> = BTreeMap::new();
    let mut duplicates = 0usize;
    for obs in weather {
        if by_hour.contains_key(&obs.timestamp) {
            duplicates += 1;
            continue;
        }
        by_hour.insert(obs.timestamp, obs);
    }
    if duplicates > 0 {
        warn!("Ignored {} duplicate weather timestamps", duplicates);
    }

    let mut rows = Vec::with_capacity(activity.rows.len());
    let mut activity_only = 0usize;
    for row in &activity.rows {
        match by_hour.get(&row.timestamp) {
            Some(obs) => rows.push(MergedRow::new(row.timestamp, row.counts.clone(), obs)),
            None => activity_only += 1,
        }
    }
    let weather_only = by_hour.len() - rows.len();

    if activity_only > 0 {
        warn!("Dropped {} activity hours without weather", activity_only);
    }
    if weather_only > 0 {
        info!("Dropped {} weather hours without activity", weather_only);
    }

    MergedTable {
        sources: activity.sources.clone(),
        rows,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::HourlyRow;
    use tw_core::time_utils::parse_timestamp;

    fn dt(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    fn obs(ts: &str, temperature: f64, code: i32) -> WeatherObservation {
        WeatherObservation {
            timestamp: dt(ts),
            temperature,
            precipitation: 0.0,
            weather_code: code,
        }
    }

    fn activity() -> HourlyTable {
        HourlyTable {
            sources: vec![SourceType::Browsing, SourceType::Like],
            rows: vec![
                HourlyRow {
                    timestamp: dt("2024-01-13 09:00:00"),
                    counts: vec![2, 1],
                },
                HourlyRow {
                    timestamp: dt("2024-01-15 10:00:00"),
                    counts: vec![3, 0],
                },
                HourlyRow {
                    timestamp: dt("2024-01-15 11:00:00"),
                    counts: vec![0, 4],
                },
            ],
        }
    }

    #[test]
    fn test_inner_join_drops_unmatched_hours() {
        let weather = vec![
            obs("2024-01-15 10:00:00", 8.5, 3),
            obs("2024-01-13 09:00:00", 5.0, 0),
            obs("2024-01-20 00:00:00", 1.0, 0),
        ];
        let merged = merge(&activity(), &weather);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.rows[0].timestamp, dt("2024-01-13 09:00:00"));
        assert_eq!(merged.rows[1].timestamp, dt("2024-01-15 10:00:00"));
        assert_eq!(merged.rows[1].temperature, 8.5);
    }

    #[test]
    fn test_derived_fields() {
        let weather = vec![
            obs("2024-01-13 09:00:00", 5.0, 0),
            obs("2024-01-15 10:00:00", 8.5, 3),
        ];
        let merged = merge(&activity(), &weather);

        let saturday = &merged.rows[0];
        assert_eq!(saturday.hour, 9);
        assert_eq!(saturday.day_of_week, Weekday::Sat);
        assert!(saturday.is_weekend);
        assert_eq!(saturday.total_activity, 3);
        assert_eq!(saturday.weather_description, Some("Clear sky"));

        let monday = &merged.rows[1];
        assert_eq!(monday.day_of_week, Weekday::Mon);
        assert!(!monday.is_weekend);
        assert_eq!(monday.weather_description, Some("Overcast"));
    }

    #[test]
    fn test_unknown_weather_code_has_no_description() {
        let merged = merge(&activity(), &[obs("2024-01-15 11:00:00", 2.0, 99)]);
        assert_eq!(merged.rows[0].weather_description, None);
        assert_eq!(merged.rows[0].weather_code, 99);
    }

    #[test]
    fn test_duplicate_weather_first_wins() {
        let weather = vec![
            obs("2024-01-15 10:00:00", 8.5, 3),
            obs("2024-01-15 10:00:00", 30.0, 0),
        ];
        let merged = merge(&activity(), &weather);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.rows[0].temperature, 8.5);
    }

    #[test]
    fn test_summary_totals() {
        let weather = vec![
            obs("2024-01-13 09:00:00", 5.0, 0),
            obs("2024-01-15 10:00:00", 8.5, 3),
            obs("2024-01-15 11:00:00", 9.0, 3),
        ];
        let summary = merge(&activity(), &weather).summary();
        assert_eq!(summary.total_hours, 3);
        assert_eq!(
            summary.column_totals,
            vec![
                ("browsing_history_count".to_string(), 5),
                ("like_list_count".to_string(), 5)
            ]
        );
        let range = summary.date_range.unwrap();
        assert_eq!(range.start, dt("2024-01-13 09:00:00"));
        assert_eq!(range.end, dt("2024-01-15 11:00:00"));
    }

    #[test]
    fn test_empty_weather_yields_empty_table() {
        let merged = merge(&activity(), &[]);
        assert!(merged.is_empty());
        assert_eq!(merged.sources.len(), 2);
        assert!(merged.summary().date_range.is_none());
    }
}
