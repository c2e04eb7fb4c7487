use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tw_core::settings::PipelinePaths;

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Create the data directories every stage writes into.
pub fn ensure_directories(paths: &PipelinePaths) -> anyhow::Result<()> {
    for dir in [
        &paths.tiktok_dir,
        &paths.processed_dir,
        &paths.weather_dir,
        &paths.merged_dir,
        &paths.analysis_dir,
        &paths.visualizations_dir,
    ] {
        std::fs::create_dir_all(dir)?;
    }
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a `DEBUG`/`INFO`/`WARNING`/`ERROR` level name to a filter directive.
/// Unknown names pass through unchanged.
fn filter_directive(log_level: &str) -> String {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.to_string(),
    }
}

/// Initialise the global `tracing` subscriber on stderr.
///
/// Falls back to `"info"` if the level string is not recognised.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(filter_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(subscriber)
        .init();

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
