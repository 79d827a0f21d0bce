//! waymark-server - Landmark Detection & Progress Service
//!
//! Hosts the detection pipeline (vision classifier → response parser →
//! geocoder) and the authoritative per-account progress store consumed by
//! the on-device sync engine.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use waymark_server::config::ServerConfig;
use waymark_server::services::{DetectionPipeline, NominatimClient, VisionClient};
use waymark_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting waymark-server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServerConfig::load()?;
    info!("Database: {}", config.database_path.display());

    let db_pool = waymark_server::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    let classifier = VisionClient::new(&config.classifier)
        .map_err(|e| anyhow::anyhow!("Failed to create vision client: {}", e))?;
    let geocoder = NominatimClient::new(&config.geocoder)?;
    let pipeline = Arc::new(DetectionPipeline::new(
        Arc::new(classifier),
        Arc::new(geocoder),
    ));

    let state = AppState::new(db_pool, pipeline);
    let app = waymark_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
