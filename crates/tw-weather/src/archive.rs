use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, warn};
use tw_core::models::WeatherObservation;
use tw_core::settings::PipelineConfig;
use tw_core::time_utils::parse_archive_time;

use crate::{WeatherArchive, WeatherError, WeatherRequest};

// ── Response shape ────────────────────────────────────────────────────────────

/// Archive JSON body; only the hourly block is used.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveResponse {
    pub hourly: HourlyBlock,
}

/// Parallel arrays, one element per hour.
#[derive(Debug, Clone, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>,
    pub temperature_2m: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
    #[serde(alias = "weather_code")]
    pub weathercode: Vec<Option<f64>>,
}

/// Turn the parallel arrays into observations.
///
/// Arrays of unequal length are rejected. Hours with any null value are
/// dropped with a warning.
pub fn normalize(response: &ArchiveResponse) -> Result<Vec<WeatherObservation>, WeatherError> {
    let h = &response.hourly;
    let n = h.time.len();
    if h.temperature_2m.len() != n || h.precipitation.len() != n || h.weathercode.len() != n {
        return Err(WeatherError::Malformed(format!(
            "hourly arrays differ in length: time={}, temperature_2m={}, precipitation={}, weathercode={}",
            n,
            h.temperature_2m.len(),
            h.precipitation.len(),
            h.weathercode.len()
        )));
    }

    let mut out = Vec::with_capacity(n);
    let mut incomplete = 0usize;
    for i in 0..n {
        let timestamp = parse_archive_time(&h.time[i])
            .ok_or_else(|| WeatherError::Malformed(format!("invalid time '{}'", h.time[i])))?;
        match (h.temperature_2m[i], h.precipitation[i], h.weathercode[i]) {
            (Some(temperature), Some(precipitation), Some(code)) => out.push(WeatherObservation {
                timestamp,
                temperature,
                precipitation,
                weather_code: code.round() as i32,
            }),
            _ => incomplete += 1,
        }
    }
    if incomplete > 0 {
        warn!("Dropped {} hours with missing weather values", incomplete);
    }
    Ok(out)
}

// ── OpenMeteoArchive ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OpenMeteoArchive {
    base_url: String,
    http: Client,
}

impl OpenMeteoArchive {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.archive_url.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherArchive for OpenMeteoArchive {
    async fn hourly(&self, request: &WeatherRequest) -> Result<Vec<WeatherObservation>, WeatherError> {
        info!(
            "Fetching weather {} to {} at ({}, {})",
            request.start_date, request.end_date, request.latitude, request.longitude
        );

        let res = self
            .http
            .get(&self.base_url)
            .query(&request.query_pairs())
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            error!("Failed to fetch weather data: {}", status);
            return Err(WeatherError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: ArchiveResponse = serde_json::from_str(&body)?;
        let observations = normalize(&parsed)?;
        debug!("Archive returned {} hourly observations", observations.len());
        Ok(observations)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
