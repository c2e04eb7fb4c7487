use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Correlate TikTok usage exports with historical hourly weather
#[derive(Parser, Debug, Clone)]
#[command(
    name = "tiktok-weather",
    about = "Correlate TikTok usage exports with historical hourly weather",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Root of the data tree (raw exports, processed tables, results)
    #[arg(long, global = true, default_value = "data")]
    pub data_dir: PathBuf,

    /// Directory chart images are written to
    #[arg(long, global = true, default_value = "visualizations")]
    pub output_dir: PathBuf,

    /// Pipeline config file (defaults to ~/.tiktok-weather/config.json)
    #[arg(long, global = true, env = "TIKTOK_WEATHER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,
}

/// Pipeline stage to execute.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Parse raw export text files into processed CSV tables
    Parse,
    /// Fetch hourly weather for the processed date range
    FetchWeather,
    /// Merge hourly activity counts with the weather table
    Merge,
    /// Compute summary statistics over the merged table
    Analyze,
    /// Render the chart catalogue from the merged table
    Visualize,
    /// Render charts for an annual daily weather text file
    Annual {
        /// Tab-separated daily weather file
        file: PathBuf,
    },
    /// Run parse, fetch-weather, merge, analyze and visualize in order
    Run,
}

impl Settings {
    /// Effective log level once `--debug` has been applied.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }

    /// Directory layout derived from `--data-dir` / `--output-dir`.
    pub fn paths(&self) -> PipelinePaths {
        PipelinePaths::new(&self.data_dir, &self.output_dir)
    }

    /// Load the pipeline config from `--config` or the default location.
    pub fn pipeline_config(&self) -> PipelineConfig {
        let path = self
            .config
            .clone()
            .unwrap_or_else(PipelineConfig::config_path);
        PipelineConfig::load_from(&path).resolved()
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────────────────

/// Default weather archive endpoint.
pub const DEFAULT_ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";

/// Location and archive parameters for the weather fetch, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub latitude: f64,
    pub longitude: f64,
    /// IANA name or `"auto"` for the system timezone.
    pub timezone: String,
    pub archive_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            latitude: 41.0082,
            longitude: 28.9784,
            timezone: "Europe/Istanbul".to_string(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
        }
    }
}

impl PipelineConfig {
    /// `~/.tiktok-weather/config.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".tiktok-weather").join("config.json")
    }

    /// Load the config from `path`.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&content) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!("Ignoring invalid config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Resolve `"auto"` and invalid timezone names.
    pub fn resolved(mut self) -> Self {
        self.timezone = crate::time_utils::resolve_timezone(&self.timezone);
        self
    }

    /// Reject coordinates outside the valid range.
    pub fn validate(&self) -> crate::Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(crate::Error::Config(format!(
                "latitude {} out of range",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(crate::Error::Config(format!(
                "longitude {} out of range",
                self.longitude
            )));
        }
        Ok(())
    }
}

// ── PipelinePaths ──────────────────────────────────────────────────────────────

/// Every file and directory a stage reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    /// Raw export text files.
    pub tiktok_dir: PathBuf,
    /// Per-source CSV tables and `date_range.csv`.
    pub processed_dir: PathBuf,
    pub weather_dir: PathBuf,
    pub merged_dir: PathBuf,
    pub analysis_dir: PathBuf,
    pub visualizations_dir: PathBuf,
}

impl PipelinePaths {
    pub fn new(data_dir: &Path, output_dir: &Path) -> Self {
        Self {
            tiktok_dir: data_dir.join("tiktok_data"),
            processed_dir: data_dir.join("processed"),
            weather_dir: data_dir.join("weather_data"),
            merged_dir: data_dir.join("merged_data"),
            analysis_dir: data_dir.join("analysis_results"),
            visualizations_dir: output_dir.to_path_buf(),
        }
    }

    pub fn date_range_csv(&self) -> PathBuf {
        self.processed_dir.join("date_range.csv")
    }

    pub fn weather_csv(&self) -> PathBuf {
        self.weather_dir.join("hourly_weather.csv")
    }

    pub fn merged_csv(&self) -> PathBuf {
        self.merged_dir.join("merged_data.csv")
    }

    /// Annual weather charts live in their own subdirectory.
    pub fn annual_dir(&self) -> PathBuf {
        self.visualizations_dir.join("annual")
    }
}

impl Default for PipelinePaths {
    fn default() -> Self {
        Self::new(Path::new("data"), Path::new("visualizations"))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
