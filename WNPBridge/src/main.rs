use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use wnpconfig::get_config;
use wnpmedia::{Bridge, BridgeSettings};
use wnpserver::{LoggingOptions, init_logging};
use wnpsource::{IdleSource, MediaSource};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging(LoggingOptions::default())?;
    let settings = BridgeSettings::from_config(&get_config());

    info!("🎵 WebNowPlaying bridge for home dashboards");

    let source: Arc<dyn MediaSource> = Arc::new(IdleSource::new());
    let bridge = Bridge::start(source, &settings).await?;

    info!("📊 Available endpoints on http://{}:", bridge.addr());
    info!("  GET  /api/media/detect  - Current media from WebNowPlaying");
    info!("  GET  /api/media/status  - Current media status");
    info!("  POST /api/media/control - Send control commands to WebNowPlaying");
    info!("  GET  /health            - Server health check");
    info!("  GET  /                  - Dashboard UI");
    info!("  GET  /swagger-ui/media  - API documentation");

    info!("🔥 Bridge ready! Press Ctrl+C to stop...");
    bridge.wait().await;

    Ok(())
}
