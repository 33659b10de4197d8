//! Gesture client
//!
//! Streams a synthetic test pattern to the server and logs the labels it
//! gets back. Reconnects every `GESTURE_RETRY_DELAY_MS` while the server is
//! unreachable.
//!
//! ## Usage
//!
//! ```bash
//! gesture-client
//! GESTURE_HOST=10.0.0.5 GESTURE_FRAME_INTERVAL_MS=50 gesture-client
//! ```

use anyhow::{Context, Result};
use tracing::info;

use gesture_link::{ClientConfig, ClientLink, ConsoleDisplay, SyntheticSource};

/// Test pattern size, matching a typical webcam.
const SOURCE_WIDTH: u32 = 640;
const SOURCE_HEIGHT: u32 = 480;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gesture_link=info".parse()?),
        )
        .init();

    let config = match std::env::var("GESTURE_CONFIG") {
        Ok(path) => ClientConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => ClientConfig::from_env(),
    };
    config.validate().context("Invalid client configuration")?;

    info!("Gesture client starting");
    info!("  Server: {}", config.server_addr());
    info!("  Frame interval: {:?}", config.frame_interval());
    info!("  Retry delay: {:?}", config.retry_delay());

    let source = SyntheticSource::new(SOURCE_WIDTH, SOURCE_HEIGHT);
    let link = ClientLink::new(config, source);
    let handle = link.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            handle.stop();
        }
    });

    link.run(ConsoleDisplay::new())
        .await
        .context("Client stopped on an unrecoverable error")?;
    info!("Client stopped");
    Ok(())
}
