//! Request messages as read off the wire.
//!
//! Uses `bytes::Bytes` for zero-copy payload sharing.
//!
//! # Example
//!
//! ```
//! use gesture_link::protocol::{build_message, Request};
//!
//! let bytes = build_message(b"hello").unwrap();
//! assert_eq!(&bytes[..4], &[0, 0, 0, 5]);
//!
//! assert!(Request::from_payload(bytes::Bytes::new()).is_no_frame());
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{encode_length, LENGTH_PREFIX_SIZE};
use crate::error::{GestureError, Result};

/// One request read from a session's stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Zero-length sentinel: the client had no frame this tick.
    NoFrame,
    /// Serialized frame payload.
    Frame(Bytes),
}

impl Request {
    /// Classify a payload read after its length prefix.
    pub fn from_payload(payload: Bytes) -> Self {
        if payload.is_empty() {
            Self::NoFrame
        } else {
            Self::Frame(payload)
        }
    }

    /// Check if this is the no-frame sentinel.
    #[inline]
    pub fn is_no_frame(&self) -> bool {
        matches!(self, Self::NoFrame)
    }

    /// Payload length as declared on the wire.
    #[inline]
    pub fn payload_len(&self) -> usize {
        match self {
            Self::NoFrame => 0,
            Self::Frame(payload) => payload.len(),
        }
    }
}

/// Build a complete length-prefixed message as a single contiguous buffer.
///
/// Fails if `payload` does not fit a `u32` length prefix.
pub fn build_message(payload: &[u8]) -> Result<Bytes> {
    let length = u32::try_from(payload.len()).map_err(|_| GestureError::PayloadTooLarge {
        size: u32::MAX,
        max: u32::MAX,
    })?;
    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_slice(&encode_length(length));
    buf.put_slice(payload);
    Ok(buf.freeze())
}
