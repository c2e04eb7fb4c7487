mod bootstrap;

use anyhow::Result;
use clap::Parser;
use tw_core::settings::{Command, Settings};
use tw_pipeline::stages;
use tw_weather::OpenMeteoArchive;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level())?;

    let paths = settings.paths();
    bootstrap::ensure_directories(&paths)?;

    tracing::info!("TikTok Weather v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Paths: {:?}", paths);

    let outcome = match &settings.command {
        Command::Parse => stages::parse(&paths).map(|_| ()),
        Command::FetchWeather => {
            let config = settings.pipeline_config();
            let archive = OpenMeteoArchive::from_config(&config);
            stages::fetch_weather(&paths, &config, &archive).await.map(|_| ())
        }
        Command::Merge => stages::merge(&paths).map(|_| ()),
        Command::Analyze => stages::analyze(&paths).map(|_| ()),
        Command::Visualize => stages::visualize(&paths).map(|_| ()),
        Command::Annual { file } => stages::annual(&paths, file).map(|_| ()),
        Command::Run => {
            let config = settings.pipeline_config();
            let archive = OpenMeteoArchive::from_config(&config);
            stages::run_all(&paths, &config, &archive).await.map(|_| ())
        }
    };

    if let Err(e) = outcome {
        tracing::error!("{}", e);
        return Err(e.into());
    }
    tracing::info!("Done");
    Ok(())
}
