//! Stage wiring for the TikTok × weather pipeline.
//!
//! Each stage reads its inputs from and writes its outputs to the locations
//! in a [`PipelinePaths`], so stages can run one at a time from the CLI or
//! back to back through [`stages::run_all`].

pub mod error;
pub mod stages;

pub use error::{PipelineError, Result};
pub use tw_core::settings::{PipelineConfig, PipelinePaths};
