//! Error types for gesture-link.

use std::time::Duration;

use thiserror::Error;

/// Main error type for all gesture-link operations.
#[derive(Debug, Error)]
pub enum GestureError {
    /// I/O error during socket or file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (config and model files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// MsgPack serialization error.
    #[error("MsgPack encode error: {0}")]
    MsgPackEncode(#[from] rmp_serde::encode::Error),

    /// MsgPack deserialization error.
    #[error("MsgPack decode error: {0}")]
    MsgPackDecode(#[from] rmp_serde::decode::Error),

    /// Peer closed the stream in the middle of a declared-length message.
    #[error("Short read: expected {expected} bytes, received {received}")]
    Framing { expected: usize, received: usize },

    /// Declared payload length is above the configured limit.
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: u32, max: u32 },

    /// Payload decoded but does not describe a usable frame.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// No data arrived within the read timeout.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// Connection closed by the peer.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Outbound connection attempt failed.
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration value.
    #[error("Config error: {0}")]
    Config(String),

    /// Model bundle could not be loaded or is inconsistent.
    #[error("Model error: {0}")]
    Model(String),

    /// Blocking inference task panicked or was cancelled.
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Coarse classification of a [`GestureError`], used to decide how a
/// session or link reacts to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Short read on a declared-length message, or an oversized declaration.
    Framing,
    /// Payload cannot be decoded as a frame.
    Deserialization,
    /// Reset, aborted, broken or closed connection.
    Connection,
    /// No data within the timeout window.
    SessionTimeout,
    /// Connect attempt failed.
    ConnectFailure,
    /// Anything else.
    Fault,
}

impl GestureError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        use std::io::ErrorKind as Io;

        match self {
            Self::Framing { .. } | Self::PayloadTooLarge { .. } => ErrorKind::Framing,
            Self::MsgPackDecode(_) | Self::InvalidFrame(_) => ErrorKind::Deserialization,
            Self::ConnectionClosed => ErrorKind::Connection,
            Self::Timeout(_) => ErrorKind::SessionTimeout,
            Self::Connect { .. } => ErrorKind::ConnectFailure,
            Self::Io(e) => match e.kind() {
                Io::ConnectionReset
                | Io::ConnectionAborted
                | Io::BrokenPipe
                | Io::UnexpectedEof
                | Io::NotConnected => ErrorKind::Connection,
                Io::TimedOut => ErrorKind::SessionTimeout,
                Io::ConnectionRefused => ErrorKind::ConnectFailure,
                _ => ErrorKind::Fault,
            },
            _ => ErrorKind::Fault,
        }
    }

    /// Whether this error ends one link without being fatal to the process.
    pub fn is_disconnect(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Connection | ErrorKind::SessionTimeout | ErrorKind::Framing
        )
    }
}

/// Result type alias using GestureError.
pub type Result<T> = std::result::Result<T, GestureError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_errors_classified_by_kind() {
        let reset = GestureError::Io(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        let pipe = GestureError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        let other = GestureError::Io(std::io::Error::other("disk on fire"));

        assert_eq!(reset.kind(), ErrorKind::Connection);
        assert_eq!(pipe.kind(), ErrorKind::Connection);
        assert_eq!(other.kind(), ErrorKind::Fault);
    }

    #[test]
    fn test_protocol_errors_classified() {
        let short = GestureError::Framing {
            expected: 10,
            received: 9,
        };
        assert_eq!(short.kind(), ErrorKind::Framing);
        assert!(short.is_disconnect());

        let bad = GestureError::InvalidFrame("zero width".into());
        assert_eq!(bad.kind(), ErrorKind::Deserialization);
        assert!(!bad.is_disconnect());

        let timeout = GestureError::Timeout(Duration::from_secs(1));
        assert_eq!(timeout.kind(), ErrorKind::SessionTimeout);
        assert!(timeout.is_disconnect());
    }

    #[test]
    fn test_connect_failure_is_not_disconnect() {
        let err = GestureError::Connect {
            addr: "127.0.0.1:1".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        };
        assert_eq!(err.kind(), ErrorKind::ConnectFailure);
        assert!(!err.is_disconnect());
        assert!(err.to_string().contains("127.0.0.1:1"));
    }
}
