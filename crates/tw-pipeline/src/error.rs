use thiserror::Error;

/// Failure of a pipeline stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Data(#[from] tw_core::Error),

    #[error(transparent)]
    Weather(#[from] tw_weather::WeatherError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
