//! Loader for annual daily weather files.
//!
//! The file is tab-separated with a `timestamp` column in `%d.%m.%Y` and up
//! to four numeric columns. Any of the numeric columns may be absent.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};
use tw_core::time_utils::parse_annual_date;
use tw_core::{Error, Result};

// ── AnnualColumn ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnualColumn {
    TemperatureMaximum,
    TemperatureMinimum,
    PrecipitationTotal,
    TemperatureAverage,
}

impl AnnualColumn {
    pub const fn all() -> [AnnualColumn; 4] {
        [
            AnnualColumn::TemperatureMaximum,
            AnnualColumn::TemperatureMinimum,
            AnnualColumn::PrecipitationTotal,
            AnnualColumn::TemperatureAverage,
        ]
    }

    /// Header text in the source file.
    pub fn header(&self) -> &'static str {
        match self {
            AnnualColumn::TemperatureMaximum => "Temperature Maximum",
            AnnualColumn::TemperatureMinimum => "Temperature Minimum",
            AnnualColumn::PrecipitationTotal => "Precipitation Total",
            AnnualColumn::TemperatureAverage => "Temperature Average",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

// ── AnnualWeather ─────────────────────────────────────────────────────────────

/// One day; a value is `None` only when its column is absent from the file.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualDay {
    pub date: NaiveDate,
    values: [Option<f64>; 4],
}

impl AnnualDay {
    pub fn new(date: NaiveDate, values: [Option<f64>; 4]) -> Self {
        Self { date, values }
    }

    pub fn get(&self, column: AnnualColumn) -> Option<f64> {
        self.values[column.index()]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnnualWeather {
    /// Numeric columns found in the header.
    pub columns: Vec<AnnualColumn>,
    /// In file order.
    pub days: Vec<AnnualDay>,
}

impl AnnualWeather {
    /// Load a tab-separated annual weather file.
    ///
    /// Rows with an unparseable date, or an unparseable value in any present
    /// numeric column, are dropped.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .flexible(true)
            .from_path(path)?;
        let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();

        let ts_idx = headers
            .iter()
            .position(|h| h == "timestamp")
            .ok_or_else(|| Error::MissingColumn {
                column: "timestamp".to_string(),
                path: path.to_path_buf(),
            })?;

        let present: Vec<(AnnualColumn, usize)> = AnnualColumn::all()
            .into_iter()
            .filter_map(|c| headers.iter().position(|h| h == c.header()).map(|i| (c, i)))
            .collect();

        let mut days = Vec::new();
        let mut dropped = 0usize;
        for record in rdr.records() {
            let record = record?;
            let parsed = (|| {
                let date = parse_annual_date(record.get(ts_idx)?)?;
                let mut values = [None; 4];
                for (column, idx) in &present {
                    let value = record.get(*idx)?.trim().parse::<f64>().ok()?;
                    if value.is_nan() {
                        return None;
                    }
                    values[column.index()] = Some(value);
                }
                Some(AnnualDay { date, values })
            })();
            match parsed {
                Some(day) => days.push(day),
                None => dropped += 1,
            }
        }
        if dropped > 0 {
            debug!("{}: dropped {} incomplete rows", path.display(), dropped);
        }
        info!("Loaded {} days from {}", days.len(), path.display());

        Ok(Self {
            columns: present.into_iter().map(|(c, _)| c).collect(),
            days,
        })
    }

    pub fn has(&self, column: AnnualColumn) -> bool {
        self.columns.contains(&column)
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.days.iter().map(|d| d.date).collect()
    }

    /// Values of `column` in file order; empty when the column is absent.
    pub fn series(&self, column: AnnualColumn) -> Vec<f64> {
        self.days.iter().filter_map(|d| d.get(column)).collect()
    }

    /// Running total of precipitation, in file order.
    pub fn cumulative_rainfall(&self) -> Vec<(NaiveDate, f64)> {
        let mut total = 0.0;
        self.days
            .iter()
            .filter_map(|d| {
                d.get(AnnualColumn::PrecipitationTotal).map(|p| {
                    total += p;
                    (d.date, total)
                })
            })
            .collect()
    }

    /// Values of `column` grouped by month number (1-12).
    pub fn by_month(&self, column: AnnualColumn) -> BTreeMap<u32, Vec<f64>> {
        let mut out: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for day in &self.days {
            if let Some(v) = day.get(column) {
                out.entry(day.date.month()).or_default().push(v);
            }
        }
        out
    }

    /// Mean of `column` per month.
    pub fn monthly_means(&self, column: AnnualColumn) -> BTreeMap<u32, f64> {
        self.by_month(column)
            .into_iter()
            .map(|(m, v)| (m, tw_core::stats::mean(&v)))
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("weather_data_2024.txt");
        std::fs::write(&path, body).unwrap();
        path
    }

    const FULL: &str = "timestamp\t Temperature Maximum \tTemperature Minimum\tPrecipitation Total\tTemperature Average\n\
01.01.2024\t10.5\t2.0\t1.0\t6.0\n\
02.01.2024\t12.0\t3.0\t0.5\t7.5\n\
bad-date\t1\t1\t1\t1\n\
03.02.2024\t8.0\tn/a\t0.0\t5.0\n\
04.02.2024\t9.0\t1.0\t2.5\t5.5\n";

    #[test]
    fn test_load_trims_headers_and_drops_bad_rows() {
        let dir = TempDir::new().unwrap();
        let weather = AnnualWeather::load(&write(&dir, FULL)).unwrap();

        assert_eq!(weather.columns, AnnualColumn::all().to_vec());
        assert_eq!(weather.days.len(), 3);
        assert_eq!(weather.days[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(weather.days[0].get(AnnualColumn::TemperatureMaximum), Some(10.5));
        assert_eq!(weather.days[2].date, NaiveDate::from_ymd_opt(2024, 2, 4).unwrap());
    }

    #[test]
    fn test_absent_columns_tolerated() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "timestamp\tPrecipitation Total\n01.03.2024\t4.0\n02.03.2024\t1.5\n");
        let weather = AnnualWeather::load(&path).unwrap();

        assert!(weather.has(AnnualColumn::PrecipitationTotal));
        assert!(!weather.has(AnnualColumn::TemperatureMaximum));
        assert!(weather.series(AnnualColumn::TemperatureMaximum).is_empty());
        assert_eq!(weather.series(AnnualColumn::PrecipitationTotal), vec![4.0, 1.5]);
    }

    #[test]
    fn test_cumulative_rainfall() {
        let dir = TempDir::new().unwrap();
        let weather = AnnualWeather::load(&write(&dir, FULL)).unwrap();
        let totals: Vec<f64> = weather.cumulative_rainfall().into_iter().map(|(_, v)| v).collect();
        assert_eq!(totals, vec![1.0, 1.5, 4.0]);
    }

    #[test]
    fn test_monthly_means() {
        let dir = TempDir::new().unwrap();
        let weather = AnnualWeather::load(&write(&dir, FULL)).unwrap();
        let means = weather.monthly_means(AnnualColumn::TemperatureMaximum);
        assert_eq!(means.len(), 2);
        assert!((means[&1] - 11.25).abs() < 1e-12);
        assert!((means[&2] - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file() {
        let err = AnnualWeather::load(Path::new("/tmp/tw-no-annual.txt")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_missing_timestamp_column() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "date\tPrecipitation Total\n01.03.2024\t4.0\n");
        let err = AnnualWeather::load(&path).unwrap_err();
        assert!(matches!(err, Error::MissingColumn { .. }));
    }
}
