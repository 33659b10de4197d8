//! Process-wide configuration, fixed at startup.
//!
//! Every setting has a default. Binaries read overrides from `GESTURE_*`
//! environment variables; a JSON file can be loaded instead. Unparsable
//! environment values fall back to the default.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{GestureError, Result};
use crate::protocol::{ResponseFraming, DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_MAX_RESPONSE_SIZE};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 12345;
pub const DEFAULT_MAX_CLIENTS: usize = 5;
pub const DEFAULT_FRAME_BUFFER_SIZE: usize = 10;
pub const DEFAULT_TIMEOUT_DURATION: u32 = 5;
pub const DEFAULT_SKIP_FRAMES: usize = 1;
pub const DEFAULT_READ_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETRY_DELAY_MS: u64 = 5000;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 33;
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 10_000;

/// Largest worker set: one semaphore permit per slot, drained with a
/// single `acquire_many(u32)` on stop.
pub const MAX_CLIENTS_LIMIT: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// Smoothing parameters for one [`GestureBuffer`](crate::recognition::GestureBuffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    /// Maximum frames kept in history.
    pub capacity: usize,
    /// Consecutive misses after which history is discarded.
    pub timeout_duration: u32,
    /// Fallback scan decimation: only every Nth buffered frame is re-detected.
    pub skip_frames: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_FRAME_BUFFER_SIZE,
            timeout_duration: DEFAULT_TIMEOUT_DURATION,
            skip_frames: DEFAULT_SKIP_FRAMES,
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// JSON model bundle (classifier weights, marker detector settings).
    pub model_path: PathBuf,
    /// Worker slots; sessions beyond this wait for a free slot.
    pub max_clients: usize,
    pub frame_buffer_size: usize,
    pub timeout_duration: u32,
    pub skip_frames: usize,
    /// Per-connection read timeout.
    pub read_timeout_secs: u64,
    pub max_payload_size: u32,
    pub response_framing: ResponseFraming,
    /// Close the session on an undecodable frame instead of answering it.
    pub strict_frames: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from("model.json"),
            max_clients: DEFAULT_MAX_CLIENTS,
            frame_buffer_size: DEFAULT_FRAME_BUFFER_SIZE,
            timeout_duration: DEFAULT_TIMEOUT_DURATION,
            skip_frames: DEFAULT_SKIP_FRAMES,
            read_timeout_secs: DEFAULT_READ_TIMEOUT_SECS,
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
            response_framing: ResponseFraming::default(),
            strict_frames: false,
        }
    }
}

impl ServerConfig {
    /// Load from `GESTURE_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("GESTURE_HOST").unwrap_or(defaults.host),
            port: env_or("GESTURE_PORT", defaults.port),
            model_path: std::env::var("GESTURE_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            max_clients: env_or("GESTURE_MAX_CLIENTS", defaults.max_clients),
            frame_buffer_size: env_or("GESTURE_FRAME_BUFFER_SIZE", defaults.frame_buffer_size),
            timeout_duration: env_or("GESTURE_TIMEOUT_DURATION", defaults.timeout_duration),
            skip_frames: env_or("GESTURE_SKIP_FRAMES", defaults.skip_frames),
            read_timeout_secs: env_or("GESTURE_READ_TIMEOUT_SECS", defaults.read_timeout_secs),
            max_payload_size: env_or("GESTURE_MAX_PAYLOAD_SIZE", defaults.max_payload_size),
            response_framing: env_or("GESTURE_RESPONSE_FRAMING", defaults.response_framing),
            strict_frames: std::env::var("GESTURE_STRICT_FRAMES")
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(defaults.strict_frames),
        }
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.max_clients == 0 {
            return Err(GestureError::Config("max_clients must be at least 1".into()));
        }
        if self.max_clients > MAX_CLIENTS_LIMIT {
            return Err(GestureError::Config(format!(
                "max_clients must be at most {}, got {}",
                MAX_CLIENTS_LIMIT, self.max_clients
            )));
        }
        if self.read_timeout_secs == 0 {
            return Err(GestureError::Config(
                "read_timeout_secs must be at least 1".into(),
            ));
        }
        self.buffer_config().validate()
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// Smoothing parameters for each session's buffer.
    pub fn buffer_config(&self) -> BufferConfig {
        BufferConfig {
            capacity: self.frame_buffer_size,
            timeout_duration: self.timeout_duration,
            skip_frames: self.skip_frames,
        }
    }
}

impl BufferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(GestureError::Config(
                "frame_buffer_size must be at least 1".into(),
            ));
        }
        if self.timeout_duration == 0 {
            return Err(GestureError::Config(
                "timeout_duration must be at least 1".into(),
            ));
        }
        if self.skip_frames == 0 {
            return Err(GestureError::Config("skip_frames must be at least 1".into()));
        }
        Ok(())
    }
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Fixed delay between connect attempts.
    pub retry_delay_ms: u64,
    /// Capture/display cadence, also used to pace requests.
    pub frame_interval_ms: u64,
    /// How long to wait for one response before treating the link as dead.
    pub response_timeout_ms: u64,
    pub response_framing: ResponseFraming,
    pub max_response_size: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
            frame_interval_ms: DEFAULT_FRAME_INTERVAL_MS,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            response_framing: ResponseFraming::default(),
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Load from `GESTURE_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            host: std::env::var("GESTURE_HOST").unwrap_or(defaults.host),
            port: env_or("GESTURE_PORT", defaults.port),
            retry_delay_ms: env_or("GESTURE_RETRY_DELAY_MS", defaults.retry_delay_ms),
            frame_interval_ms: env_or("GESTURE_FRAME_INTERVAL_MS", defaults.frame_interval_ms),
            response_timeout_ms: env_or(
                "GESTURE_RESPONSE_TIMEOUT_MS",
                defaults.response_timeout_ms,
            ),
            response_framing: env_or("GESTURE_RESPONSE_FRAMING", defaults.response_framing),
            max_response_size: env_or("GESTURE_MAX_RESPONSE_SIZE", defaults.max_response_size),
        }
    }

    /// Load from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(GestureError::Config("port must be non-zero".into()));
        }
        if self.frame_interval_ms == 0 {
            return Err(GestureError::Config(
                "frame_interval_ms must be at least 1".into(),
            ));
        }
        if self.max_response_size == 0 {
            return Err(GestureError::Config(
                "max_response_size must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// `host:port` to connect to.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
