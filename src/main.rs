use anyhow::Result;
use dotenv::dotenv;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod fetcher;
mod mapbox;
mod models;

use commands::{process_dataset, retry_failed};
use config::Config;
use fetcher::ReqwestTransport;
use models::Split;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    config.ensure_directories()?;
    let transport = ReqwestTransport::new(config.request_timeout)?;

    for split in Split::ALL {
        if let Err(err) = process_dataset(&config, &transport, split).await {
            error!(%split, error = %err, "failed to process split");
        }
    }

    retry_failed(&config, &transport).await?;

    info!("all downloads completed");
    Ok(())
}
