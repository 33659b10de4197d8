//! # gesture-link
//!
//! Real-time hand-gesture recognition over TCP.
//!
//! A client streams camera frames to a server; the server answers each
//! frame with a gesture label. Per connection the server keeps a short
//! frame history so that a hand lost for a few frames (occlusion, motion
//! blur) can still be labelled from the most recent frame where it was
//! visible.
//!
//! ## Wire protocol
//!
//! ```text
//! request:  [u32 BE length][MessagePack frame]   (length 0 = no frame)
//! response: [u32 BE length][UTF-8 label]         (or raw label bytes)
//! ```
//!
//! Exactly one response per request, never pipelined.
//!
//! ## Example
//!
//! ```ignore
//! use gesture_link::{ConnectionPool, ModelBundle, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> gesture_link::Result<()> {
//!     let config = ServerConfig::from_env();
//!     let recognizer = ModelBundle::from_json_file(&config.model_path)?.into_recognizer();
//!     let pool = ConnectionPool::bind(&config, recognizer).await?;
//!     pool.run().await
//! }
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod frame;
pub mod protocol;
pub mod recognition;
pub mod server;
pub mod shutdown;
pub mod transport;

pub use client::{ClientLink, ConsoleDisplay, FrameSource, LabelDisplay, LinkHandle, SyntheticSource};
pub use config::{BufferConfig, ClientConfig, ServerConfig};
pub use error::{ErrorKind, GestureError, Result};
pub use frame::{Frame, PixelFormat};
pub use recognition::{
    Classifier, GestureBuffer, LandmarkDetector, ModelBundle, RecognitionResult, Recognizer,
};
pub use server::{ConnectionPool, PoolHandle};
