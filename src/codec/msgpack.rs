//! MsgPack codec using `rmp-serde`.
//!
//! Always `to_vec_named`: structs go out as maps keyed by field name, which
//! is what other MessagePack implementations expect to read.

use crate::error::Result;
use crate::frame::Frame;

/// MessagePack codec for structured data.
pub struct MsgPackCodec;

impl MsgPackCodec {
    /// Encode a value to MsgPack bytes (struct-as-map).
    #[inline]
    pub fn encode<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(value)?)
    }

    /// Decode MsgPack bytes to a value.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

/// Codec for frame payloads.
///
/// Decoding also validates the frame, so a payload that parses but whose
/// pixel buffer does not match its dimensions is rejected here.
pub struct FrameCodec;

impl FrameCodec {
    /// Encode a frame for the wire.
    pub fn encode(frame: &Frame) -> Result<Vec<u8>> {
        MsgPackCodec::encode(frame)
    }

    /// Decode and validate a frame payload.
    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        let frame: Frame = MsgPackCodec::decode(bytes)?;
        frame.validate()?;
        Ok(frame)
    }
}
