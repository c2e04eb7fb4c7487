use thiserror::Error;

/// Failures while fetching or decoding archive data.
#[derive(Error, Debug)]
pub enum WeatherError {
    /// The request never produced a response.
    #[error("Weather request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The archive answered with a non-success status.
    #[error("Weather archive returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse weather response: {0}")]
    Json(#[from] serde_json::Error),

    /// The response parsed but its shape is inconsistent.
    #[error("Malformed weather response: {0}")]
    Malformed(String),
}
