//! Wire format encoding and decoding.
//!
//! Requests carry a 4-byte length prefix:
//! ```text
//! ┌──────────┬──────────────────────┐
//! │ Length   │ Payload              │
//! │ 4 bytes  │ `length` bytes       │
//! │ uint32 BE│ MsgPack frame        │
//! └──────────┴──────────────────────┘
//! ```
//!
//! A zero length is the "no frame this tick" sentinel, not an error.
//! Responses are either framed the same way or sent as raw label bytes,
//! depending on [`ResponseFraming`].

use serde::{Deserialize, Serialize};

use crate::error::{GestureError, Result};

/// Length prefix size in bytes (fixed, exactly 4).
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Default maximum request payload size (64 MiB).
pub const DEFAULT_MAX_PAYLOAD_SIZE: u32 = 64 * 1024 * 1024;

/// Default maximum response size accepted by the client.
pub const DEFAULT_MAX_RESPONSE_SIZE: u32 = 4096;

/// Response sent when no hand is visible (or no frame was sent).
pub const NO_HAND_DETECTED: &str = "No hand detected";

/// Response sent when a hand was seen but no label could be derived.
pub const NO_GESTURE_RECOGNIZED: &str = "No gesture recognized";

/// How response labels are put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFraming {
    /// Same 4-byte length prefix as requests.
    #[default]
    LengthPrefixed,
    /// Bare label bytes with no prefix (legacy peers).
    Raw,
}

impl std::str::FromStr for ResponseFraming {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "length_prefixed" | "prefixed" => Ok(Self::LengthPrefixed),
            "raw" => Ok(Self::Raw),
            other => Err(GestureError::Config(format!(
                "unknown response framing '{}'",
                other
            ))),
        }
    }
}

/// Encode a payload length as a big-endian prefix.
#[inline]
pub fn encode_length(length: u32) -> [u8; LENGTH_PREFIX_SIZE] {
    length.to_be_bytes()
}

/// Decode a big-endian length prefix.
///
/// Returns `None` if the buffer is too short.
#[inline]
pub fn decode_length(buf: &[u8]) -> Option<u32> {
    let prefix: [u8; LENGTH_PREFIX_SIZE] = buf.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_be_bytes(prefix))
}

/// Check a declared payload length against the limit.
pub fn validate_length(length: u32, max_payload_size: u32) -> Result<()> {
    if length > max_payload_size {
        return Err(GestureError::PayloadTooLarge {
            size: length,
            max: max_payload_size,
        });
    }
    Ok(())
}

/// Check whether a response string is one of the two sentinels.
#[inline]
pub fn is_sentinel(label: &str) -> bool {
    label == NO_HAND_DETECTED || label == NO_GESTURE_RECOGNIZED
}
