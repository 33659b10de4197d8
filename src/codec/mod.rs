//! Codec module - serialization of frame payloads.
//!
//! Frames travel as MessagePack maps (`rmp-serde`, named fields) so that a
//! non-Rust capture client can produce them with any MessagePack library.
//!
//! # Example
//!
//! ```
//! use gesture_link::codec::FrameCodec;
//! use gesture_link::{Frame, PixelFormat};
//!
//! let frame = Frame::filled(2, 2, PixelFormat::Bgr8, [0, 128, 255]).unwrap();
//! let encoded = FrameCodec::encode(&frame).unwrap();
//! let decoded = FrameCodec::decode(&encoded).unwrap();
//! assert_eq!(decoded, frame);
//! ```

mod msgpack;

pub use msgpack::{FrameCodec, MsgPackCodec};
