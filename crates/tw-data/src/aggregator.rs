//! Hourly activity aggregation.
//!
//! Each source's timestamps are floored to the hour and counted, then the
//! per-source counts are outer-joined into one table keyed by hour with
//! absent counts filled as zero.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};
use tw_core::models::SourceType;
use tw_core::time_utils::floor_to_hour;
use tw_core::{Error, Result};
use walkdir::WalkDir;

use crate::extractor::Extraction;
use crate::tables;

/// Processed files that are not per-source tables.
const SKIPPED_PREFIXES: &[&str] = &["merged_", "date_range", "processed"];

// ── HourlyRow ─────────────────────────────────────────────────────────────────

/// Activity counts for one hour, one entry per participating source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HourlyRow {
    pub timestamp: NaiveDateTime,
    pub counts: Vec<u64>,
}

impl HourlyRow {
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

// ── HourlyTable ───────────────────────────────────────────────────────────────

/// Outer join of per-source hourly counts.
///
/// `sources` lists the participating sources in canonical order; every row's
/// `counts` is aligned with it. Rows are strictly ascending by hour.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HourlyTable {
    pub sources: Vec<SourceType>,
    pub rows: Vec<HourlyRow>,
}

impl HourlyTable {
    /// Aggregate raw timestamps grouped by source.
    ///
    /// Sources without any timestamps do not participate.
    pub fn from_sources<I>(per_source: BTreeMap<SourceType, I>) -> Self
    where
        I: IntoIterator<Item = NaiveDateTime>,
    {
        let mut counted: Vec<(SourceType, BTreeMap<NaiveDateTime, u64>)> = Vec::new();
        for (source, timestamps) in per_source {
            let counts = count_per_hour(timestamps);
            if counts.is_empty() {
                debug!("{}: no records, not aggregated", source);
                continue;
            }
            counted.push((source, counts));
        }
        outer_join(counted)
    }

    /// Aggregate freshly extracted records.
    pub fn from_extractions(extractions: &BTreeMap<SourceType, Extraction>) -> Self {
        Self::from_sources(
            extractions
                .iter()
                .map(|(source, ex)| (*source, ex.timestamps().collect::<Vec<_>>()))
                .collect(),
        )
    }

    /// Aggregate the per-source CSV tables found directly inside `dir`.
    ///
    /// Files whose stem is not a known source are skipped with a warning, as
    /// are tables without a `timestamp` column.
    pub fn from_processed_dir(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            return Err(Error::FileNotFound(dir.to_path_buf()));
        }

        let mut per_source: BTreeMap<SourceType, Vec<NaiveDateTime>> = BTreeMap::new();
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if SKIPPED_PREFIXES.iter().any(|p| stem.starts_with(p)) {
                continue;
            }
            let Some(source) = SourceType::from_stem(stem) else {
                warn!("Skipping unrecognised table {}", path.display());
                continue;
            };

            match tables::read_activity_timestamps(path) {
                Ok(timestamps) => {
                    debug!("{}: {} timestamps", path.display(), timestamps.len());
                    per_source.insert(source, timestamps);
                }
                Err(Error::MissingColumn { column, path }) => {
                    warn!("Skipping {}: no '{}' column", path.display(), column);
                }
                Err(e) => return Err(e),
            }
        }

        let table = Self::from_sources(per_source);
        info!(
            "Aggregated {} sources into {} hourly rows",
            table.sources.len(),
            table.rows.len()
        );
        Ok(table)
    }

    /// Count column names in the same order as `sources`.
    pub fn count_columns(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.count_column()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Total number of records across every hour and source.
    pub fn total_records(&self) -> u64 {
        self.rows.iter().map(HourlyRow::total).sum()
    }
}

// ── Private ───────────────────────────────────────────────────────────────────

fn count_per_hour(timestamps: impl IntoIterator<Item = NaiveDateTime>) -> BTreeMap<NaiveDateTime, u64> {
    let mut counts = BTreeMap::new();
    for ts in timestamps {
        *counts.entry(floor_to_hour(ts)).or_insert(0) += 1;
    }
    counts
}

/// Full outer join on the hour key; a source missing from an hour counts 0.
fn outer_join(mut counted: Vec<(SourceType, BTreeMap<NaiveDateTime, u64>)>) -> HourlyTable {
    counted.sort_by_key(|(source, _)| *source);
    let width = counted.len();

    let mut joined: BTreeMap<NaiveDateTime, Vec<u64>> = BTreeMap::new();
    for (idx, (_, counts)) in counted.iter().enumerate() {
        for (hour, n) in counts {
            joined.entry(*hour).or_insert_with(|| vec![0; width])[idx] = *n;
        }
    }

    HourlyTable {
        sources: counted.into_iter().map(|(s, _)| s).collect(),
        rows: joined
            .into_iter()
            .map(|(timestamp, counts)| HourlyRow { timestamp, counts })
            .collect(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tw_core::time_utils::parse_timestamp;
    use tempfile::TempDir;

    fn dt(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn test_counts_floor_to_hour() {
        let mut input = BTreeMap::new();
        input.insert(
            SourceType::Browsing,
            vec![
                dt("2024-01-15 10:12:00"),
                dt("2024-01-15 10:40:31"),
                dt("2024-01-15 11:00:00"),
            ],
        );
        let table = HourlyTable::from_sources(input);

        assert_eq!(table.sources, vec![SourceType::Browsing]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].timestamp, dt("2024-01-15 10:00:00"));
        assert_eq!(table.rows[0].counts, vec![2]);
        assert_eq!(table.rows[1].counts, vec![1]);
        assert_eq!(table.total_records(), 3);
    }

    #[test]
    fn test_outer_join_fills_zero() {
        let mut input = BTreeMap::new();
        input.insert(SourceType::Login, vec![dt("2024-01-15 09:30:00")]);
        input.insert(
            SourceType::Browsing,
            vec![dt("2024-01-15 10:05:00"), dt("2024-01-15 10:06:00")],
        );
        let table = HourlyTable::from_sources(input);

        assert_eq!(table.sources, vec![SourceType::Browsing, SourceType::Login]);
        assert_eq!(
            table.count_columns(),
            vec!["browsing_history_count", "login_history_count"]
        );
        assert_eq!(table.rows[0].timestamp, dt("2024-01-15 09:00:00"));
        assert_eq!(table.rows[0].counts, vec![0, 1]);
        assert_eq!(table.rows[1].counts, vec![2, 0]);
    }

    #[test]
    fn test_rows_strictly_ascending() {
        let mut input = BTreeMap::new();
        input.insert(
            SourceType::Like,
            vec![
                dt("2024-03-02 00:10:00"),
                dt("2024-03-01 23:59:59"),
                dt("2024-03-01 05:00:00"),
            ],
        );
        let table = HourlyTable::from_sources(input);
        assert!(table.rows.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        assert_eq!(table.rows[0].timestamp, dt("2024-03-01 05:00:00"));
    }

    #[test]
    fn test_empty_source_does_not_participate() {
        let mut input: BTreeMap<SourceType, Vec<NaiveDateTime>> = BTreeMap::new();
        input.insert(SourceType::Share, vec![]);
        input.insert(SourceType::Like, vec![dt("2024-01-01 12:00:00")]);
        let table = HourlyTable::from_sources(input);
        assert_eq!(table.sources, vec![SourceType::Like]);
    }

    #[test]
    fn test_total_records_preserved_across_sources() {
        let mut input = BTreeMap::new();
        input.insert(
            SourceType::Browsing,
            vec![dt("2024-01-15 10:05:00"), dt("2024-01-15 10:55:00"), dt("2024-01-15 11:20:00")],
        );
        input.insert(
            SourceType::Like,
            vec![dt("2024-01-15 10:30:00"), dt("2024-01-15 13:00:00")],
        );
        input.insert(SourceType::Share, vec![dt("2024-01-15 15:45:00")]);
        let table = HourlyTable::from_sources(input);

        // 10:00 is shared by two sources; 11:00, 13:00 and 15:00 have one each.
        assert_eq!(table.sources, vec![SourceType::Browsing, SourceType::Like, SourceType::Share]);
        assert_eq!(table.rows.len(), 4);
        assert_eq!(table.total_records(), 6);
        let per_row: Vec<u64> = table.rows.iter().map(HourlyRow::total).collect();
        assert_eq!(per_row, vec![3, 1, 1, 1]);
        let per_source: Vec<u64> = (0..table.sources.len())
            .map(|i| table.rows.iter().map(|r| r.counts[i]).sum())
            .collect();
        assert_eq!(per_source, vec![3, 2, 1]);
    }

    #[test]
    fn test_from_processed_dir_skips_non_source_tables() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("like_list.csv"),
            "timestamp,link\n2024-01-15 10:12:00,a\n2024-01-15 10:40:00,b\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("date_range.csv"),
            "start_date,end_date\n2024-01-15 10:12:00,2024-01-15 10:40:00\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("merged_old.csv"), "timestamp\n").unwrap();
        std::fs::write(dir.path().join("notes.csv"), "timestamp\n2024-01-15 10:00:00\n").unwrap();
        std::fs::write(dir.path().join("share_history.csv"), "when,link\nx,y\n").unwrap();

        let table = HourlyTable::from_processed_dir(dir.path()).unwrap();
        assert_eq!(table.sources, vec![SourceType::Like]);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].counts, vec![2]);
    }

    #[test]
    fn test_from_processed_dir_missing() {
        let err = HourlyTable::from_processed_dir(Path::new("/tmp/tw-no-such-processed")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
