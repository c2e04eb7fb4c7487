//! PNG chart rendering for the merged activity table and annual weather files.

pub mod activity;
pub mod annual;
pub mod batch;
pub mod draw;
pub mod geometry;
pub mod palette;

pub use batch::{ChartJob, RenderReport};
