//! Summary statistics over the merged hourly table.
//!
//! The report has three parts: basic usage figures, correlation of weather
//! against total activity, and per-hour usage patterns. [`AnalysisReport`]
//! renders them into the `analysis_results` directory.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Timelike};
use tracing::info;
use tw_core::formatting::format_stat;
use tw_core::stats::{mean, pearson, round2, Correlation};
use tw_core::time_utils::day_of;
use tw_core::{Error, Result};

use crate::merge::MergedTable;

// ── BasicStats ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BasicStats {
    /// Distinct calendar dates with at least one merged hour.
    pub total_days: usize,
    pub total_activities: u64,
    /// Mean of the per-day activity sums.
    pub avg_daily_activities: f64,
    /// Hour of day with the highest mean activity; ties go to the earliest hour.
    pub peak_activity_hour: Option<u32>,
    pub weekend_avg: f64,
    pub weekday_avg: f64,
}

impl BasicStats {
    pub fn compute(table: &MergedTable) -> Self {
        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for row in &table.rows {
            *per_day.entry(day_of(&row.timestamp)).or_insert(0) += row.total_activity;
        }
        let daily: Vec<f64> = per_day.values().map(|v| *v as f64).collect();

        let mut peak: Option<(u32, f64)> = None;
        for (hour, values) in group_by_hour(table) {
            let m = mean(&values);
            match peak {
                Some((_, best)) if m <= best => {}
                _ => peak = Some((hour, m)),
            }
        }

        let (weekend, weekday): (Vec<_>, Vec<_>) =
            table.rows.iter().partition(|r| r.is_weekend);
        let avg = |rows: &[&crate::merge::MergedRow]| {
            mean(&rows.iter().map(|r| r.total_activity as f64).collect::<Vec<_>>())
        };

        Self {
            total_days: per_day.len(),
            total_activities: table.rows.iter().map(|r| r.total_activity).sum(),
            avg_daily_activities: mean(&daily),
            peak_activity_hour: peak.map(|(h, _)| h),
            weekend_avg: avg(&weekend),
            weekday_avg: avg(&weekday),
        }
    }
}

// ── Weather correlations ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeatherCorrelations {
    pub temperature: Correlation,
    pub precipitation: Correlation,
}

impl WeatherCorrelations {
    pub fn compute(table: &MergedTable) -> Self {
        let totals = table.totals();
        Self {
            temperature: pearson(&table.temperatures(), &totals),
            precipitation: pearson(&table.precipitations(), &totals),
        }
    }

    fn named(&self) -> [(&'static str, Correlation); 2] {
        [
            ("temperature", self.temperature),
            ("precipitation", self.precipitation),
        ]
    }
}

/// Mean activity for one weather description.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherActivity {
    pub weather_description: String,
    pub mean_activity: f64,
    pub occurrence_count: usize,
}

/// Group by description (rows without one are excluded), sorted by mean
/// activity descending. Equal means keep alphabetical order.
pub fn activity_by_weather(table: &MergedTable) -> Vec<WeatherActivity> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        if let Some(desc) = row.weather_description {
            groups
                .entry(desc)
                .or_default()
                .push(row.total_activity as f64);
        }
    }

    let mut out: Vec<WeatherActivity> = groups
        .into_iter()
        .map(|(desc, values)| WeatherActivity {
            weather_description: desc.to_string(),
            mean_activity: mean(&values),
            occurrence_count: values.len(),
        })
        .collect();
    out.sort_by(|a, b| b.mean_activity.total_cmp(&a.mean_activity));
    out
}

// ── Hourly patterns ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyPattern {
    pub hour: u32,
    /// Rounded to two decimals.
    pub mean: f64,
    pub count: usize,
    pub sum: u64,
}

pub fn hourly_patterns(table: &MergedTable) -> Vec<HourlyPattern> {
    group_by_hour(table)
        .into_iter()
        .map(|(hour, values)| HourlyPattern {
            hour,
            mean: round2(mean(&values)),
            count: values.len(),
            sum: values.iter().sum::<f64>() as u64,
        })
        .collect()
}

fn group_by_hour(table: &MergedTable) -> BTreeMap<u32, Vec<f64>> {
    let mut by_hour: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for row in &table.rows {
        by_hour
            .entry(row.timestamp.hour())
            .or_default()
            .push(row.total_activity as f64);
    }
    by_hour
}

// ── AnalysisReport ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub basic: BasicStats,
    pub correlations: WeatherCorrelations,
    pub activity_by_weather: Vec<WeatherActivity>,
    pub hourly_patterns: Vec<HourlyPattern>,
}

impl AnalysisReport {
    /// Run every analysis over `table`.
    ///
    /// An empty table yields zero totals, NaN averages and correlations, and
    /// empty group tables.
    pub fn analyze(table: &MergedTable) -> Self {
        Self {
            basic: BasicStats::compute(table),
            correlations: WeatherCorrelations::compute(table),
            activity_by_weather: activity_by_weather(table),
            hourly_patterns: hourly_patterns(table),
        }
    }

    /// Plain-text summary written to `analysis_summary.txt`.
    pub fn summary_text(&self) -> String {
        let b = &self.basic;
        let mut out = String::new();
        out.push_str("=== TikTok Weather Analysis Results ===\n\n");
        out.push_str("Basic Statistics:\n");
        let _ = writeln!(out, "total_days: {}", b.total_days);
        let _ = writeln!(out, "total_activities: {}", b.total_activities);
        let _ = writeln!(
            out,
            "avg_daily_activities: {}",
            format_stat(b.avg_daily_activities, 2)
        );
        let _ = writeln!(
            out,
            "peak_activity_hour: {}",
            b.peak_activity_hour
                .map_or_else(|| "n/a".to_string(), |h| h.to_string())
        );
        let _ = writeln!(out, "weekend_avg: {}", format_stat(b.weekend_avg, 2));
        let _ = writeln!(out, "weekday_avg: {}", format_stat(b.weekday_avg, 2));

        out.push_str("\nWeather Correlations:\n");
        for (name, c) in self.correlations.named() {
            let _ = writeln!(
                out,
                "{}: correlation={}, p-value={}",
                name,
                format_stat(c.coefficient, 3),
                format_stat(c.p_value, 3)
            );
        }
        out
    }

    /// Write the summary and both pattern tables into `dir`.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir).map_err(|source| Error::FileWrite {
            path: dir.to_path_buf(),
            source,
        })?;

        let summary = dir.join("analysis_summary.txt");
        std::fs::write(&summary, self.summary_text()).map_err(|source| Error::FileWrite {
            path: summary.clone(),
            source,
        })?;

        let weather = dir.join("weather_activity_patterns.csv");
        let mut wtr = csv::Writer::from_path(&weather)?;
        wtr.write_record(["weather_description", "total_activity", "occurrence_count"])?;
        for w in &self.activity_by_weather {
            wtr.write_record([
                w.weather_description.clone(),
                w.mean_activity.to_string(),
                w.occurrence_count.to_string(),
            ])?;
        }
        wtr.flush()?;

        let hourly = dir.join("hourly_patterns.csv");
        let mut wtr = csv::Writer::from_path(&hourly)?;
        wtr.write_record(["hour", "mean", "count", "sum"])?;
        for h in &self.hourly_patterns {
            wtr.write_record([
                h.hour.to_string(),
                h.mean.to_string(),
                h.count.to_string(),
                h.sum.to_string(),
            ])?;
        }
        wtr.flush()?;

        info!("Analysis results written to {}", dir.display());
        Ok(vec![summary, weather, hourly])
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
