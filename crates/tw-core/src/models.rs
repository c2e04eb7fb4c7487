use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The kind of TikTok export a record was read from.
///
/// Variants are declared in canonical column order; `Ord` follows that order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Browsing,
    Sound,
    Favorite,
    Like,
    Share,
    Login,
}

impl SourceType {
    /// Every source in canonical order.
    pub const fn all() -> &'static [SourceType] {
        &[
            SourceType::Browsing,
            SourceType::Sound,
            SourceType::Favorite,
            SourceType::Like,
            SourceType::Share,
            SourceType::Login,
        ]
    }

    /// File name of the raw export inside the TikTok data directory.
    pub fn raw_file_name(&self) -> &'static str {
        match self {
            SourceType::Browsing => "browsing_history.txt",
            SourceType::Sound => "favorite_sounds.txt",
            SourceType::Favorite => "favorite_videos.txt",
            SourceType::Like => "like_list.txt",
            SourceType::Share => "share_history.txt",
            SourceType::Login => "login_history.txt",
        }
    }

    /// Label prefix of the detail line carrying the record's attribute.
    pub fn label(&self) -> &'static str {
        match self {
            SourceType::Sound => "Sound Link:",
            SourceType::Login => "Device Model:",
            _ => "Link:",
        }
    }

    /// Column name the attribute is stored under in the processed table.
    pub fn field_name(&self) -> &'static str {
        match self {
            SourceType::Login => "device",
            _ => "link",
        }
    }

    /// Stem shared by the processed CSV file and the hourly count column.
    pub fn stem(&self) -> &'static str {
        match self {
            SourceType::Browsing => "browsing_history",
            SourceType::Sound => "favorite_sounds",
            SourceType::Favorite => "favorite_videos",
            SourceType::Like => "like_list",
            SourceType::Share => "share_history",
            SourceType::Login => "login_history",
        }
    }

    /// Name of the hourly count column, e.g. `"like_list_count"`.
    pub fn count_column(&self) -> String {
        format!("{}{}", self.stem(), COUNT_SUFFIX)
    }

    /// Reverse of [`SourceType::stem`].
    pub fn from_stem(stem: &str) -> Option<SourceType> {
        Self::all().iter().copied().find(|s| s.stem() == stem)
    }

    /// Human-readable title derived from the stem, e.g. `"Like List"`.
    pub fn title(&self) -> String {
        title_case(self.stem())
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.stem())
    }
}

/// Suffix identifying per-source count columns in the hourly and merged tables.
pub const COUNT_SUFFIX: &str = "_count";

/// `"share_history"` → `"Share History"`.
pub fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One detail line extracted from a raw export file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Value of the most recent `Date:` header.
    pub timestamp: NaiveDateTime,
    pub source_type: SourceType,
    /// The labelled value (a link or a device model).
    pub attribute: String,
}

/// One hourly observation from the weather archive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Hour-aligned local timestamp.
    pub timestamp: NaiveDateTime,
    /// Air temperature at 2 m, °C.
    pub temperature: f64,
    /// Precipitation, mm.
    pub precipitation: f64,
    pub weather_code: i32,
}

/// Earliest and latest timestamp seen across all extracted sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Widen the range to include `ts`.
    pub fn include(&mut self, ts: NaiveDateTime) {
        if ts < self.start {
            self.start = ts;
        }
        if ts > self.end {
            self.end = ts;
        }
    }

    /// Build a range covering every timestamp in `timestamps`.
    ///
    /// Returns `None` when the iterator is empty.
    pub fn covering(timestamps: impl IntoIterator<Item = NaiveDateTime>) -> Option<DateRange> {
        let mut iter = timestamps.into_iter();
        let first = iter.next()?;
        let mut range = DateRange {
            start: first,
            end: first,
        };
        for ts in iter {
            range.include(ts);
        }
        Some(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_source_labels() {
        assert_eq!(SourceType::Browsing.label(), "Link:");
        assert_eq!(SourceType::Sound.label(), "Sound Link:");
        assert_eq!(SourceType::Login.label(), "Device Model:");
        assert_eq!(SourceType::Login.field_name(), "device");
        assert_eq!(SourceType::Share.field_name(), "link");
    }

    #[test]
    fn test_count_column_names() {
        assert_eq!(SourceType::Browsing.count_column(), "browsing_history_count");
        assert_eq!(SourceType::Like.count_column(), "like_list_count");
    }

    #[test]
    fn test_from_stem_roundtrip() {
        for source in SourceType::all() {
            assert_eq!(SourceType::from_stem(source.stem()), Some(*source));
        }
        assert_eq!(SourceType::from_stem("merged_data"), None);
    }

    #[test]
    fn test_canonical_ordering() {
        let mut shuffled = vec![SourceType::Login, SourceType::Browsing, SourceType::Like];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![SourceType::Browsing, SourceType::Like, SourceType::Login]
        );
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("share_history"), "Share History");
        assert_eq!(SourceType::Sound.title(), "Favorite Sounds");
        assert_eq!(title_case("is_weekend"), "Is Weekend");
    }

    #[test]
    fn test_date_range_covering() {
        let range = DateRange::covering([ts(5, 3), ts(1, 9), ts(9, 0)]).unwrap();
        assert_eq!(range.start, ts(1, 9));
        assert_eq!(range.end, ts(9, 0));
    }

    #[test]
    fn test_date_range_covering_empty() {
        assert!(DateRange::covering(Vec::new()).is_none());
    }
}
