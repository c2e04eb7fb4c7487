//! One function per pipeline stage.
//!
//! Stages communicate only through the files under [`PipelinePaths`].
//! A stage whose inputs are missing fails before writing anything.

use std::path::{Path, PathBuf};

use tracing::{error, info, warn};
use tw_charts::RenderReport;
use tw_core::models::{DateRange, WeatherObservation};
use tw_core::settings::{PipelineConfig, PipelinePaths};
use tw_core::Error;
use tw_data::aggregator::HourlyTable;
use tw_data::analysis::AnalysisReport;
use tw_data::annual::AnnualWeather;
use tw_data::merge::{merge as merge_tables, MergedTable};
use tw_data::{extractor, tables};
use tw_weather::{WeatherArchive, WeatherRequest};

use crate::Result;

// ── Parse ─────────────────────────────────────────────────────────────────────

/// What the parse stage wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    /// Per-source processed tables.
    pub tables: Vec<PathBuf>,
    pub date_range: DateRange,
    pub total_records: usize,
    /// Distinct clock hours with at least one record.
    pub active_hours: usize,
}

/// Extract every raw export into `processed/<stem>.csv` and record the
/// overall date range in `processed/date_range.csv`.
pub fn parse(paths: &PipelinePaths) -> Result<ParseOutcome> {
    if !paths.tiktok_dir.is_dir() {
        return Err(Error::FileNotFound(paths.tiktok_dir.clone()).into());
    }
    let extractions = extractor::extract_all(&paths.tiktok_dir)?;
    let total_records: usize = extractions.values().map(|e| e.records.len()).sum();
    let orphaned: usize = extractions.values().map(|e| e.orphaned_lines).sum();
    if orphaned > 0 {
        warn!("Skipped {} detail lines with no preceding date", orphaned);
    }

    let Some(date_range) = extractor::date_range(extractions.values()) else {
        return Err(Error::NoData(format!(
            "no records found in {}",
            paths.tiktok_dir.display()
        ))
        .into());
    };

    let hourly = HourlyTable::from_extractions(&extractions);
    let written = tables::write_processed(&paths.processed_dir, &extractions)?;
    tables::write_date_range(&paths.date_range_csv(), &date_range)?;
    info!(
        "Parsed {} records from {} sources over {} active hours ({} to {})",
        total_records,
        extractions.len(),
        hourly.rows.len(),
        date_range.start,
        date_range.end
    );

    Ok(ParseOutcome {
        tables: written,
        date_range,
        total_records,
        active_hours: hourly.rows.len(),
    })
}

// ── Fetch weather ─────────────────────────────────────────────────────────────

/// Fetch hourly weather for the parsed date range and save it.
///
/// An empty response is an error; nothing is written in that case.
pub async fn fetch_weather(
    paths: &PipelinePaths,
    config: &PipelineConfig,
    archive: &dyn WeatherArchive,
) -> Result<Vec<WeatherObservation>> {
    config.validate()?;
    let range = tables::read_date_range(&paths.date_range_csv())?;
    let request = WeatherRequest::for_range(config, &range);
    info!(
        "Fetching weather {} to {} at ({}, {}) in {}",
        request.start_date, request.end_date, request.latitude, request.longitude, request.timezone
    );

    let observations = match archive.hourly(&request).await {
        Ok(obs) => obs,
        Err(e) => {
            error!("Error fetching weather data: {}", e);
            return Err(e.into());
        }
    };
    if observations.is_empty() {
        return Err(Error::NoData("weather archive returned no hourly observations".to_string()).into());
    }

    tables::write_weather_csv(&paths.weather_csv(), &observations)?;
    info!(
        "Saved {} hourly observations to {}",
        observations.len(),
        paths.weather_csv().display()
    );
    Ok(observations)
}

// ── Merge ─────────────────────────────────────────────────────────────────────

/// Join the hourly activity counts with the saved weather table.
pub fn merge(paths: &PipelinePaths) -> Result<MergedTable> {
    let activity = HourlyTable::from_processed_dir(&paths.processed_dir)?;
    if activity.is_empty() {
        return Err(Error::NoData(format!(
            "no activity tables in {}",
            paths.processed_dir.display()
        ))
        .into());
    }
    let weather = tables::read_weather_csv(&paths.weather_csv())?;

    let merged = merge_tables(&activity, &weather);
    if merged.is_empty() {
        return Err(Error::NoData("activity and weather share no hours".to_string()).into());
    }
    merged.summary().log();
    tables::write_merged_csv(&paths.merged_csv(), &merged)?;
    info!("Saved merged table to {}", paths.merged_csv().display());
    Ok(merged)
}

// ── Analyze ───────────────────────────────────────────────────────────────────

/// Compute the statistics report and write it under `analysis_results/`.
pub fn analyze(paths: &PipelinePaths) -> Result<AnalysisReport> {
    let merged = tables::read_merged_csv(&paths.merged_csv())?;
    if merged.is_empty() {
        return Err(Error::NoData("merged table has no rows".to_string()).into());
    }
    let report = AnalysisReport::analyze(&merged);
    for line in report.summary_text().lines() {
        info!("{}", line);
    }
    let written = report.write_to(&paths.analysis_dir)?;
    info!("Wrote {} analysis files to {}", written.len(), paths.analysis_dir.display());
    Ok(report)
}

// ── Charts ────────────────────────────────────────────────────────────────────

/// Render the activity chart catalogue from the merged table.
pub fn visualize(paths: &PipelinePaths) -> Result<RenderReport> {
    let merged = tables::read_merged_csv(&paths.merged_csv())?;
    if merged.is_empty() {
        return Err(Error::NoData("merged table has no rows".to_string()).into());
    }
    let report = tw_charts::activity::render(&merged, &paths.visualizations_dir);
    log_report("activity", &report);
    Ok(report)
}

/// Render the annual weather charts for `file` into the annual directory.
pub fn annual(paths: &PipelinePaths, file: &Path) -> Result<RenderReport> {
    let weather = AnnualWeather::load(file)?;
    if weather.days.is_empty() {
        return Err(Error::NoData(format!("no usable days in {}", file.display())).into());
    }
    let report = tw_charts::annual::render(&weather, &paths.annual_dir());
    log_report("annual", &report);
    Ok(report)
}

fn log_report(kind: &str, report: &RenderReport) {
    if report.is_complete() {
        info!("Rendered all {} {} charts", report.rendered.len(), kind);
    } else {
        warn!(
            "Rendered {} {} charts, {} failed",
            report.rendered.len(),
            kind,
            report.failed.len()
        );
    }
}

// ── Whole chain ───────────────────────────────────────────────────────────────

/// Parse, fetch, merge, analyze and visualize in order, stopping at the first
/// failing stage.
pub async fn run_all(
    paths: &PipelinePaths,
    config: &PipelineConfig,
    archive: &dyn WeatherArchive,
) -> Result<RenderReport> {
    info!("Step 1: parsing TikTok exports");
    parse(paths)?;
    info!("Step 2: fetching weather data");
    fetch_weather(paths, config, archive).await?;
    info!("Step 3: merging activity with weather");
    merge(paths)?;
    info!("Step 4: analyzing merged data");
    analyze(paths)?;
    info!("Step 5: rendering charts");
    visualize(paths)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tw_core::time_utils::parse_timestamp;
    use tw_weather::WeatherError;

    use crate::PipelineError;

    #[derive(Debug, Default)]
    struct FakeArchive {
        observations: Vec<WeatherObservation>,
        fail: bool,
        seen: Mutex<Vec<WeatherRequest>>,
    }

    #[async_trait]
    impl WeatherArchive for FakeArchive {
        async fn hourly(&self, request: &WeatherRequest) -> std::result::Result<Vec<WeatherObservation>, WeatherError> {
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(WeatherError::Status {
                    status: 500,
                    body: "upstream".to_string(),
                });
            }
            Ok(self.observations.clone())
        }
    }

    fn obs(ts: &str, temperature: f64, code: i32) -> WeatherObservation {
        WeatherObservation {
            timestamp: parse_timestamp(ts).unwrap(),
            temperature,
            precipitation: 0.0,
            weather_code: code,
        }
    }

    fn setup() -> (TempDir, PipelinePaths) {
        let tmp = TempDir::new().expect("tempdir");
        let paths = PipelinePaths::new(&tmp.path().join("data"), &tmp.path().join("charts"));
        std::fs::create_dir_all(&paths.tiktok_dir).unwrap();
        std::fs::write(
            paths.tiktok_dir.join("browsing_history.txt"),
            "Date: 2024-01-15 10:12:00\nLink: https://www.tiktokv.com/share/video/1/\n\n\
             Date: 2024-01-15 10:48:30\nLink: https://www.tiktokv.com/share/video/2/\n\n\
             Date: 2024-01-15 10:59:59\nLink: https://www.tiktokv.com/share/video/3/\n\n\
             Date: 2024-01-15 12:05:00\nLink: https://www.tiktokv.com/share/video/4/\n",
        )
        .unwrap();
        std::fs::write(
            paths.tiktok_dir.join("like_list.txt"),
            "Date: 2024-01-15 10:30:00\nLink: https://www.tiktokv.com/share/video/9/\n",
        )
        .unwrap();
        (tmp, paths)
    }

    fn archive() -> FakeArchive {
        FakeArchive {
            observations: vec![
                obs("2024-01-15 10:00:00", 5.0, 0),
                obs("2024-01-15 11:00:00", 6.0, 3),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_writes_tables_and_range() {
        let (_tmp, paths) = setup();
        let outcome = parse(&paths).unwrap();

        assert_eq!(outcome.total_records, 5);
        // 10:00 and 12:00
        assert_eq!(outcome.active_hours, 2);
        assert_eq!(outcome.tables.len(), 2);
        assert!(paths.processed_dir.join("browsing_history.csv").exists());
        assert!(paths.processed_dir.join("like_list.csv").exists());
        let range = tables::read_date_range(&paths.date_range_csv()).unwrap();
        assert_eq!(range.start, parse_timestamp("2024-01-15 10:12:00").unwrap());
        assert_eq!(range.end, parse_timestamp("2024-01-15 12:05:00").unwrap());
    }

    #[test]
    fn test_parse_missing_input_dir() {
        let tmp = TempDir::new().unwrap();
        let paths = PipelinePaths::new(&tmp.path().join("nothing"), tmp.path());
        let err = parse(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::Data(Error::FileNotFound(_))));
        assert!(!paths.processed_dir.exists());
    }

    #[test]
    fn test_parse_without_records_is_no_data() {
        let tmp = TempDir::new().unwrap();
        let paths = PipelinePaths::new(tmp.path(), tmp.path());
        std::fs::create_dir_all(&paths.tiktok_dir).unwrap();
        let err = parse(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::Data(Error::NoData(_))));
    }

    #[tokio::test]
    async fn test_fetch_weather_uses_parsed_range() {
        let (_tmp, paths) = setup();
        parse(&paths).unwrap();
        let archive = archive();

        let saved = fetch_weather(&paths, &PipelineConfig::default(), &archive)
            .await
            .unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(tables::read_weather_csv(&paths.weather_csv()).unwrap(), saved);

        let seen = archive.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].start_date.to_string(), "2024-01-15");
        assert_eq!(seen[0].end_date.to_string(), "2024-01-15");
        assert_eq!(seen[0].latitude, 41.0082);
    }

    #[tokio::test]
    async fn test_fetch_weather_empty_is_hard_stop() {
        let (_tmp, paths) = setup();
        parse(&paths).unwrap();
        let empty = FakeArchive::default();

        let err = fetch_weather(&paths, &PipelineConfig::default(), &empty)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Data(Error::NoData(_))));
        assert!(!paths.weather_csv().exists());
    }

    #[tokio::test]
    async fn test_fetch_weather_http_failure_writes_nothing() {
        let (_tmp, paths) = setup();
        parse(&paths).unwrap();
        let failing = FakeArchive {
            fail: true,
            ..Default::default()
        };

        let err = fetch_weather(&paths, &PipelineConfig::default(), &failing)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Weather(WeatherError::Status { status: 500, .. })));
        assert!(!paths.weather_csv().exists());
    }

    #[tokio::test]
    async fn test_fetch_weather_requires_date_range() {
        let (_tmp, paths) = setup();
        let err = fetch_weather(&paths, &PipelineConfig::default(), &archive())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Data(Error::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_merge_inner_joins_hours() {
        let (_tmp, paths) = setup();
        parse(&paths).unwrap();
        fetch_weather(&paths, &PipelineConfig::default(), &archive())
            .await
            .unwrap();

        let merged = merge(&paths).unwrap();
        // 10:00 has activity and weather; 11:00 weather only; 12:00 activity only.
        assert_eq!(merged.len(), 1);
        let row = &merged.rows[0];
        assert_eq!(row.counts, vec![3, 1]);
        assert_eq!(row.total_activity, 4);
        assert_eq!(row.weather_description, Some("Clear sky"));
        assert!(paths.merged_csv().exists());
    }

    #[test]
    fn test_merge_requires_weather() {
        let (_tmp, paths) = setup();
        parse(&paths).unwrap();
        let err = merge(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::Data(Error::FileNotFound(_))));
        assert!(!paths.merged_csv().exists());
    }

    #[test]
    fn test_analyze_requires_merged_table() {
        let (_tmp, paths) = setup();
        let err = analyze(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::Data(Error::FileNotFound(_))));
    }

    #[test]
    fn test_analyze_empty_merged_table_writes_nothing() {
        let (_tmp, paths) = setup();
        tables::write_merged_csv(&paths.merged_csv(), &MergedTable::default()).unwrap();
        let err = analyze(&paths).unwrap_err();
        assert!(matches!(err, PipelineError::Data(Error::NoData(_))));
        assert!(!paths.analysis_dir.join("analysis_summary.txt").exists());
    }

    #[tokio::test]
    async fn test_run_all_produces_every_output() {
        let (_tmp, paths) = setup();
        let report = run_all(&paths, &PipelineConfig::default(), &archive())
            .await
            .unwrap();

        assert!(paths.analysis_dir.join("analysis_summary.txt").exists());
        assert!(paths.analysis_dir.join("weather_activity_patterns.csv").exists());
        assert!(paths.analysis_dir.join("hourly_patterns.csv").exists());
        // 14 fixed charts plus one per count column; failures are reported, not fatal.
        assert_eq!(report.rendered.len() + report.failed.len(), 16);
    }

    #[test]
    fn test_annual_missing_file() {
        let tmp = TempDir::new().unwrap();
        let paths = PipelinePaths::new(tmp.path(), tmp.path());
        let err = annual(&paths, &tmp.path().join("weather_data_2024.txt")).unwrap_err();
        assert!(matches!(err, PipelineError::Data(Error::FileNotFound(_))));
    }
}
