//! ADS-B Viewer - headless tracker
//!
//! Polls the receiver's aircraft.json, maintains aircraft state and trails
//! and logs tracker statistics. The viewer-gateway binary serves the same
//! engine to browsers.

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use adsb_viewer::{Config, TrackerService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("===========================================");
    info!("   ADS-B Viewer - headless tracker");
    info!("===========================================");

    let config = Config::from_env();

    info!("Configuration:");
    info!("  Data source: {}", config.data_source);
    match config.poll_interval_ms {
        Some(ms) => info!("  Poll interval: {} ms", ms),
        None => info!("  Poll interval: receiver default"),
    }
    info!("  Reaper interval: {} s", config.reaper_interval_secs);
    if let Some(dir) = &config.db_dir {
        info!("  Metadata database: {}", dir.display());
    }
    if let Some(path) = &config.filter_state_path {
        info!("  Filter state: {}", path.display());
    }
    info!("  Units: {}", config.display_units);

    let (service, _handle) = TrackerService::open(config).await?;

    info!("  Press Ctrl+C to stop.");
    service
        .run(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    info!("Shutdown complete");
    Ok(())
}
