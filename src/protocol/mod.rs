//! Protocol module - wire format, framing, and request types.
//!
//! This module implements the binary protocol between client and server:
//! - 4-byte big-endian length prefix encoding/decoding
//! - Async read/write helpers with short-read detection
//! - Sentinel response strings

mod frame;
mod framer;
mod wire_format;

pub use frame::{build_message, Request};
pub use framer::{
    read_length, read_length_after, read_payload, read_response, recv_exact, send_frame, send_no_frame,
    write_response,
};
pub use wire_format::{
    decode_length, encode_length, is_sentinel, validate_length, ResponseFraming,
    DEFAULT_MAX_PAYLOAD_SIZE, DEFAULT_MAX_RESPONSE_SIZE, LENGTH_PREFIX_SIZE,
    NO_GESTURE_RECOGNIZED, NO_HAND_DETECTED,
};
