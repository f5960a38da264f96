use anyhow::Result;
use food_vision::{config, logging, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (before logging setup)
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init(&config.logs.level) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    info!(
        "Starting food recognition service with log level: {}",
        logging::resolve_log_level(&config.logs.level)
    );

    server::run_recognition(config).await?;

    Ok(())
}
