//! CSV persistence for every table passed between stages.
//!
//! Timestamps are written as `%Y-%m-%d %H:%M:%S`. Booleans in the merged table
//! are written as `True` / `False`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use tw_core::models::{DateRange, SourceType, WeatherObservation, COUNT_SUFFIX};
use tw_core::time_utils::{format_timestamp, parse_archive_time, parse_timestamp, weekday_name};
use tw_core::{Error, Result};

use crate::extractor::Extraction;
use crate::merge::{MergedRow, MergedTable};

// ── Shared helpers ────────────────────────────────────────────────────────────

fn writer_for(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(csv::Writer::from_path(path)?)
}

fn reader_for(path: &Path) -> Result<csv::Reader<std::fs::File>> {
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    Ok(csv::Reader::from_path(path)?)
}

fn column_index(headers: &csv::StringRecord, column: &str, path: &Path) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == column)
        .ok_or_else(|| Error::MissingColumn {
            column: column.to_string(),
            path: path.to_path_buf(),
        })
}

/// Accepts both `2024-01-15 10:00:00` and `2024-01-15T10:00`.
fn parse_any_timestamp(s: &str) -> Option<NaiveDateTime> {
    parse_timestamp(s).or_else(|| parse_archive_time(s))
}

/// Integers may have been written as floats (`3.0`) by other tools.
fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

// ── Processed activity tables ─────────────────────────────────────────────────

/// Write one `timestamp,<field>` row per extracted record.
pub fn write_activity_csv(path: &Path, extraction: &Extraction) -> Result<()> {
    let mut wtr = writer_for(path)?;
    wtr.write_record(["timestamp", extraction.field.as_str()])?;
    for record in &extraction.records {
        wtr.write_record([format_timestamp(&record.timestamp).as_str(), record.attribute.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write `<stem>.csv` for every extraction into `dir`.
pub fn write_processed(
    dir: &Path,
    extractions: &BTreeMap<SourceType, Extraction>,
) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(extractions.len());
    for (source, extraction) in extractions {
        let path = dir.join(format!("{}.csv", source.stem()));
        write_activity_csv(&path, extraction)?;
        debug!("Wrote {} ({} rows)", path.display(), extraction.records.len());
        written.push(path);
    }
    Ok(written)
}

/// Timestamps of a processed activity table.
///
/// Rows whose timestamp does not parse are skipped with a warning.
pub fn read_activity_timestamps(path: &Path) -> Result<Vec<NaiveDateTime>> {
    let mut rdr = reader_for(path)?;
    let headers = rdr.headers()?.clone();
    let ts_idx = column_index(&headers, "timestamp", path)?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let record = record?;
        match record.get(ts_idx).and_then(parse_any_timestamp) {
            Some(ts) => out.push(ts),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{}: skipped {} rows with invalid timestamps", path.display(), skipped);
    }
    Ok(out)
}

// ── Date range ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct DateRangeRow {
    start_date: String,
    end_date: String,
}

pub fn write_date_range(path: &Path, range: &DateRange) -> Result<()> {
    let mut wtr = writer_for(path)?;
    wtr.serialize(DateRangeRow {
        start_date: format_timestamp(&range.start),
        end_date: format_timestamp(&range.end),
    })?;
    wtr.flush()?;
    Ok(())
}

pub fn read_date_range(path: &Path) -> Result<DateRange> {
    let mut rdr = reader_for(path)?;
    let row: DateRangeRow = rdr
        .deserialize::<DateRangeRow>()
        .next()
        .ok_or_else(|| Error::NoData(format!("{} has no rows", path.display())))??;

    let parse = |value: &str| {
        parse_any_timestamp(value).ok_or_else(|| Error::TimestampParse {
            line: 2,
            value: value.to_string(),
        })
    };
    Ok(DateRange {
        start: parse(&row.start_date)?,
        end: parse(&row.end_date)?,
    })
}

// ── Hourly weather ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct WeatherRow<'a> {
    timestamp: &'a str,
    temperature: f64,
    precipitation: f64,
    weather_code: i32,
}

pub fn write_weather_csv(path: &Path, observations: &[WeatherObservation]) -> Result<()> {
    let mut wtr = writer_for(path)?;
    for obs in observations {
        let ts = format_timestamp(&obs.timestamp);
        wtr.serialize(WeatherRow {
            timestamp: &ts,
            temperature: obs.temperature,
            precipitation: obs.precipitation,
            weather_code: obs.weather_code,
        })?;
    }
    // An empty table still needs its header.
    if observations.is_empty() {
        wtr.write_record(["timestamp", "temperature", "precipitation", "weather_code"])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read the hourly weather table; rows with unparseable fields are dropped.
pub fn read_weather_csv(path: &Path) -> Result<Vec<WeatherObservation>> {
    let mut rdr = reader_for(path)?;
    let headers = rdr.headers()?.clone();
    let ts = column_index(&headers, "timestamp", path)?;
    let temp = column_index(&headers, "temperature", path)?;
    let precip = column_index(&headers, "precipitation", path)?;
    let code = column_index(&headers, "weather_code", path)?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let record = record?;
        let parsed = (|| {
            Some(WeatherObservation {
                timestamp: parse_any_timestamp(record.get(ts)?)?,
                temperature: parse_number(record.get(temp)?)?,
                precipitation: parse_number(record.get(precip)?)?,
                weather_code: parse_number(record.get(code)?)? as i32,
            })
        })();
        match parsed {
            Some(obs) => out.push(obs),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{}: skipped {} incomplete weather rows", path.display(), skipped);
    }
    Ok(out)
}

// ── Merged table ──────────────────────────────────────────────────────────────

const WEATHER_COLUMNS: [&str; 4] = [
    "temperature",
    "precipitation",
    "weather_code",
    "weather_description",
];
const DERIVED_COLUMNS: [&str; 4] = ["hour", "day_of_week", "is_weekend", "total_activity"];

pub fn write_merged_csv(path: &Path, table: &MergedTable) -> Result<()> {
    let mut wtr = writer_for(path)?;

    let mut header = vec!["timestamp".to_string()];
    header.extend(table.count_columns());
    header.extend(WEATHER_COLUMNS.iter().map(|c| c.to_string()));
    header.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(header.len());
        record.push(format_timestamp(&row.timestamp));
        record.extend(row.counts.iter().map(|c| c.to_string()));
        record.push(row.temperature.to_string());
        record.push(row.precipitation.to_string());
        record.push(row.weather_code.to_string());
        record.push(row.weather_description.unwrap_or_default().to_string());
        record.push(row.hour.to_string());
        record.push(weekday_name(row.day_of_week).to_string());
        record.push(bool_text(row.is_weekend).to_string());
        record.push(row.total_activity.to_string());
        wtr.write_record(&record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a merged table back.
///
/// Count columns are recognised by their `_count` suffix. Derived columns
/// are recomputed from the timestamp and weather code rather than trusted.
pub fn read_merged_csv(path: &Path) -> Result<MergedTable> {
    let mut rdr = reader_for(path)?;
    let headers = rdr.headers()?.clone();
    let ts = column_index(&headers, "timestamp", path)?;
    let temp = column_index(&headers, "temperature", path)?;
    let precip = column_index(&headers, "precipitation", path)?;
    let code = column_index(&headers, "weather_code", path)?;

    let mut count_cols: Vec<(SourceType, usize)> = Vec::new();
    for (idx, name) in headers.iter().enumerate() {
        let Some(stem) = name.trim().strip_suffix(COUNT_SUFFIX) else {
            continue;
        };
        match SourceType::from_stem(stem) {
            Some(source) => count_cols.push((source, idx)),
            None => warn!("{}: ignoring unknown count column '{}'", path.display(), name),
        }
    }
    count_cols.sort_by_key(|(source, _)| *source);

    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for record in rdr.records() {
        let record = record?;
        let parsed = (|| {
            let timestamp = parse_any_timestamp(record.get(ts)?)?;
            let weather = WeatherObservation {
                timestamp,
                temperature: parse_number(record.get(temp)?)?,
                precipitation: parse_number(record.get(precip)?)?,
                weather_code: parse_number(record.get(code)?)? as i32,
            };
            let counts = count_cols
                .iter()
                .map(|(_, idx)| parse_number(record.get(*idx)?).map(|v| v.max(0.0).round() as u64))
                .collect::<Option<Vec<u64>>>()?;
            Some(MergedRow::new(timestamp, counts, &weather))
        })();
        match parsed {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!("{}: skipped {} malformed rows", path.display(), skipped);
    }
    rows.sort_by_key(|r| r.timestamp);

    Ok(MergedTable {
        sources: count_cols.into_iter().map(|(s, _)| s).collect(),
        rows,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
