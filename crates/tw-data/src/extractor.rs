//! Line-oriented record extraction from TikTok export text files.
//!
//! Every export uses the same layout: a `Date: YYYY-MM-DD HH:MM:SS` header
//! followed by labelled detail lines. One [`Extractor`] instance per source
//! type picks out the lines carrying that source's label.

use std::collections::BTreeMap;
use std::io::BufRead;
use std::path::Path;

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, info, warn};
use tw_core::models::{ActivityRecord, DateRange, SourceType};
use tw_core::time_utils::parse_timestamp;
use tw_core::{Error, Result};

// ── Extraction ────────────────────────────────────────────────────────────────

/// Records pulled out of one export file.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub source: SourceType,
    /// Column name the attribute is written under.
    pub field: String,
    pub records: Vec<ActivityRecord>,
    /// Matching detail lines that appeared before any `Date:` header.
    pub orphaned_lines: usize,
}

impl Extraction {
    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.records.iter().map(|r| r.timestamp)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ── Extractor ─────────────────────────────────────────────────────────────────

/// Parameterised extractor: a target label and the field it is stored under.
#[derive(Debug, Clone)]
pub struct Extractor {
    source: SourceType,
    field: String,
    date_line: Regex,
    label_line: Regex,
}

/// The most recent `Date:` header.
struct DateHeader {
    line: usize,
    raw: String,
    parsed: Option<NaiveDateTime>,
}

impl Extractor {
    /// Build an extractor matching lines that start with `label`.
    pub fn new(source: SourceType, label: &str, field: &str) -> Self {
        let date_line = Regex::new(r"^Date:\s*(.*)$").expect("static regex");
        let label_line = Regex::new(&format!(r"^{}\s*(.*)$", regex::escape(label)))
            .expect("escaped label is a valid regex");
        Self {
            source,
            field: field.to_string(),
            date_line,
            label_line,
        }
    }

    /// The extractor configured for one of the six export types.
    pub fn for_source(source: SourceType) -> Self {
        Self::new(source, source.label(), source.field_name())
    }

    pub fn source(&self) -> SourceType {
        self.source
    }

    /// Extract records from the export text `text`.
    ///
    /// Fails with [`Error::TimestampParse`] when a matching line is attributed
    /// to a `Date:` header whose value does not parse.
    pub fn extract_str(&self, text: &str) -> Result<Extraction> {
        self.extract_lines(text.lines().map(|l| Ok(l.to_string())))
    }

    /// Extract records from the export file at `path`.
    pub fn extract_file(&self, path: &Path) -> Result<Extraction> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let file = std::fs::File::open(path).map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = std::io::BufReader::new(file);
        let lines = reader.lines().map(|l| {
            l.map_err(|source| Error::FileRead {
                path: path.to_path_buf(),
                source,
            })
        });
        let extraction = self.extract_lines(lines)?;
        debug!(
            "{}: {} records, {} orphaned lines",
            path.display(),
            extraction.records.len(),
            extraction.orphaned_lines
        );
        Ok(extraction)
    }

    fn extract_lines(&self, lines: impl Iterator<Item = Result<String>>) -> Result<Extraction> {
        let mut current: Option<DateHeader> = None;
        let mut records = Vec::new();
        let mut orphaned_lines = 0usize;

        for (idx, line) in lines.enumerate() {
            let line = line?;
            let line = line.trim();
            let line_no = idx + 1;

            if let Some(caps) = self.date_line.captures(line) {
                let raw = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();
                current = Some(DateHeader {
                    line: line_no,
                    parsed: parse_timestamp(&raw),
                    raw,
                });
                continue;
            }

            let Some(caps) = self.label_line.captures(line) else {
                continue;
            };
            let attribute = caps.get(1).map_or("", |m| m.as_str()).trim().to_string();

            let Some(header) = current.as_ref() else {
                debug!(
                    "line {}: '{}' before any Date header, skipped",
                    line_no, line
                );
                orphaned_lines += 1;
                continue;
            };

            let timestamp = header.parsed.ok_or_else(|| Error::TimestampParse {
                line: header.line,
                value: header.raw.clone(),
            })?;

            records.push(ActivityRecord {
                timestamp,
                source_type: self.source,
                attribute,
            });
        }

        Ok(Extraction {
            source: self.source,
            field: self.field.clone(),
            records,
            orphaned_lines,
        })
    }
}

// ── Batch helpers ─────────────────────────────────────────────────────────────

/// Run every source's extractor over the raw files in `input_dir`.
///
/// Missing files are logged and skipped; the result only holds sources whose
/// file was present.
pub fn extract_all(input_dir: &Path) -> Result<BTreeMap<SourceType, Extraction>> {
    let mut out = BTreeMap::new();
    for source in SourceType::all() {
        let path = input_dir.join(source.raw_file_name());
        if !path.exists() {
            warn!("File not found: {}", path.display());
            continue;
        }
        let extraction = Extractor::for_source(*source).extract_file(&path)?;
        info!(
            "Parsed {} -> {} records",
            source.raw_file_name(),
            extraction.records.len()
        );
        out.insert(*source, extraction);
    }
    Ok(out)
}

/// Earliest and latest timestamp across all extractions.
pub fn date_range<'a>(extractions: impl IntoIterator<Item = &'a Extraction>) -> Option<DateRange> {
    DateRange::covering(extractions.into_iter().flat_map(|e| e.timestamps()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn dt(s: &str) -> NaiveDateTime {
        parse_timestamp(s).unwrap()
    }

    const BROWSING: &str = "\
Date: 2024-01-15 10:12:00
Link: https://www.tiktokv.com/share/video/1/

Date: 2024-01-15 10:40:31
Link: https://www.tiktokv.com/share/video/2/
";

    #[test]
    fn test_one_record_per_matching_line() {
        let ex = Extractor::for_source(SourceType::Browsing)
            .extract_str(BROWSING)
            .unwrap();
        assert_eq!(ex.records.len(), 2);
        assert_eq!(ex.records[0].timestamp, dt("2024-01-15 10:12:00"));
        assert_eq!(ex.records[0].attribute, "https://www.tiktokv.com/share/video/1/");
        assert_eq!(ex.records[1].timestamp, dt("2024-01-15 10:40:31"));
        assert_eq!(ex.field, "link");
        assert_eq!(ex.orphaned_lines, 0);
    }

    #[test]
    fn test_multiple_labels_share_latest_date() {
        let text = "Date: 2024-01-15 10:00:00\nLink: a\nLink: b\nDate: 2024-01-15 11:00:00\nLink: c\n";
        let ex = Extractor::for_source(SourceType::Like).extract_str(text).unwrap();
        let stamps: Vec<_> = ex.timestamps().collect();
        assert_eq!(
            stamps,
            vec![
                dt("2024-01-15 10:00:00"),
                dt("2024-01-15 10:00:00"),
                dt("2024-01-15 11:00:00")
            ]
        );
    }

    #[test]
    fn test_orphan_lines_skipped_and_counted() {
        let text = "Link: orphan\nDate: 2024-01-15 10:00:00\nLink: kept\n";
        let ex = Extractor::for_source(SourceType::Share).extract_str(text).unwrap();
        assert_eq!(ex.records.len(), 1);
        assert_eq!(ex.records[0].attribute, "kept");
        assert_eq!(ex.orphaned_lines, 1);
    }

    #[test]
    fn test_link_label_does_not_match_sound_link() {
        let text = "Date: 2024-01-15 10:00:00\nSound Link: https://sound/1\n";
        let links = Extractor::for_source(SourceType::Favorite).extract_str(text).unwrap();
        assert!(links.is_empty());

        let sounds = Extractor::for_source(SourceType::Sound).extract_str(text).unwrap();
        assert_eq!(sounds.records.len(), 1);
        assert_eq!(sounds.records[0].attribute, "https://sound/1");
        assert_eq!(sounds.records[0].source_type, SourceType::Sound);
    }

    #[test]
    fn test_login_device_model() {
        let text = "Date: 2024-02-01 08:05:09\nIP: 10.0.0.1\nDevice Model: iPhone14,2\nSystem: iOS 17\n";
        let ex = Extractor::for_source(SourceType::Login).extract_str(text).unwrap();
        assert_eq!(ex.records.len(), 1);
        assert_eq!(ex.records[0].attribute, "iPhone14,2");
        assert_eq!(ex.field, "device");
    }

    #[test]
    fn test_indented_lines_are_trimmed() {
        let text = "   Date: 2024-01-15 10:00:00  \n\t Link: x \n";
        let ex = Extractor::for_source(SourceType::Browsing).extract_str(text).unwrap();
        assert_eq!(ex.records.len(), 1);
        assert_eq!(ex.records[0].attribute, "x");
    }

    #[test]
    fn test_unparseable_date_fails_when_attributed() {
        let text = "Date: yesterday\nLink: x\n";
        let err = Extractor::for_source(SourceType::Browsing)
            .extract_str(text)
            .unwrap_err();
        match err {
            Error::TimestampParse { line, value } => {
                assert_eq!(line, 1);
                assert_eq!(value, "yesterday");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unparseable_date_without_records_is_fine() {
        let text = "Date: yesterday\nIP: 1.2.3.4\n";
        let ex = Extractor::for_source(SourceType::Browsing).extract_str(text).unwrap();
        assert!(ex.is_empty());
    }

    #[test]
    fn test_custom_label_and_field() {
        let text = "Date: 2024-01-15 10:00:00\nComment: hello there\n";
        let ex = Extractor::new(SourceType::Share, "Comment:", "comment")
            .extract_str(text)
            .unwrap();
        assert_eq!(ex.records[0].attribute, "hello there");
        assert_eq!(ex.field, "comment");
    }

    #[test]
    fn test_extract_file_missing() {
        let err = Extractor::for_source(SourceType::Like)
            .extract_file(Path::new("/tmp/does-not-exist-tw-extract.txt"))
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound(_)));
    }

    #[test]
    fn test_extract_all_skips_missing_files() {
        let dir = TempDir::new().unwrap();
        let mut f = std::fs::File::create(dir.path().join("browsing_history.txt")).unwrap();
        write!(f, "{}", BROWSING).unwrap();
        let mut f = std::fs::File::create(dir.path().join("login_history.txt")).unwrap();
        writeln!(f, "Date: 2024-01-14 22:00:00\nDevice Model: Pixel 7").unwrap();

        let all = extract_all(dir.path()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&SourceType::Browsing].records.len(), 2);
        assert_eq!(all[&SourceType::Login].records.len(), 1);

        let range = date_range(all.values()).unwrap();
        assert_eq!(range.start, dt("2024-01-14 22:00:00"));
        assert_eq!(range.end, dt("2024-01-15 10:40:31"));
    }

    #[test]
    fn test_date_range_none_when_nothing_extracted() {
        let ex = Extractor::for_source(SourceType::Like).extract_str("").unwrap();
        assert!(date_range([&ex]).is_none());
    }
}
