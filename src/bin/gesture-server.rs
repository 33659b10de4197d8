//! Gesture server
//!
//! ## Usage
//!
//! ```bash
//! # Defaults: 127.0.0.1:12345, model.json, 5 workers
//! gesture-server
//!
//! # Override through the environment
//! GESTURE_HOST=0.0.0.0 GESTURE_MODEL_PATH=/srv/model.json gesture-server
//!
//! # Or a JSON config file
//! GESTURE_CONFIG=server.json gesture-server
//! ```

use anyhow::{Context, Result};
use tracing::info;

use gesture_link::{ConnectionPool, ModelBundle, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gesture_link=info".parse()?),
        )
        .init();

    let config = match std::env::var("GESTURE_CONFIG") {
        Ok(path) => ServerConfig::from_json_file(&path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        Err(_) => ServerConfig::from_env(),
    };
    config.validate().context("Invalid server configuration")?;

    info!("Gesture server starting");
    info!("  Model: {}", config.model_path.display());
    info!("  Workers: {}", config.max_clients);
    info!(
        "  Smoothing: buffer={} timeout={} skip={}",
        config.frame_buffer_size, config.timeout_duration, config.skip_frames
    );
    info!("  Responses: {:?}", config.response_framing);

    let recognizer = ModelBundle::from_json_file(&config.model_path)
        .with_context(|| format!("Failed to load model from {}", config.model_path.display()))?
        .into_recognizer();

    let pool = ConnectionPool::bind(&config, recognizer)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr()))?;
    let handle = pool.handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received shutdown signal");
            handle.stop();
        }
    });

    pool.run().await?;
    Ok(())
}
