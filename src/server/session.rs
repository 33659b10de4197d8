//! One accepted connection.
//!
//! The session owns its [`GestureBuffer`]; nothing about it is shared with
//! other sessions except the read-only [`Recognizer`]. Requests are served
//! strictly one at a time:
//!
//! 1. read the length prefix (racing the stop flag until its first byte)
//! 2. zero length: answer "No hand detected" without touching the models
//! 3. otherwise read the payload, decode the frame, run the buffer on the
//!    blocking pool and answer with its label
//!
//! Every read and write is bounded by the read timeout.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, trace, warn};

use crate::codec::FrameCodec;
use crate::config::{BufferConfig, ServerConfig};
use crate::error::{GestureError, Result};
use crate::protocol::{
    read_length_after, read_payload, recv_exact, write_response, Request, ResponseFraming,
    NO_GESTURE_RECOGNIZED, NO_HAND_DETECTED,
};
use crate::recognition::{GestureBuffer, RecognitionResult, Recognizer};
use crate::shutdown::StopListener;

/// Per-session settings derived from [`ServerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub read_timeout: Duration,
    pub max_payload_size: u32,
    pub response_framing: ResponseFraming,
    pub strict_frames: bool,
    pub buffer: BufferConfig,
}

impl From<&ServerConfig> for SessionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            max_payload_size: config.max_payload_size,
            response_framing: config.response_framing,
            strict_frames: config.strict_frames,
            buffer: config.buffer_config(),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// Counters reported when the session ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    /// Requests answered, of any kind.
    pub requests: u64,
    /// Zero-length "no frame" requests.
    pub empty: u64,
    /// Payloads that failed to decode and were skipped.
    pub malformed: u64,
    /// Responses carrying a gesture label.
    pub gestures: u64,
}

/// Why a session ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Peer closed between messages.
    PeerClosed,
    /// The pool was stopped while the session was idle.
    Stopped,
}

enum Incoming {
    Request(Request),
    Closed,
    Stopped,
}

/// Serves one connection until the peer leaves, an error occurs, or the
/// pool stops.
pub struct SessionHandler<S> {
    id: u64,
    peer: SocketAddr,
    stream: S,
    settings: SessionSettings,
    recognizer: Recognizer,
    stop: StopListener,
    stats: SessionStats,
}

impl<S> SessionHandler<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        id: u64,
        peer: SocketAddr,
        stream: S,
        settings: SessionSettings,
        recognizer: Recognizer,
        stop: StopListener,
    ) -> Self {
        Self {
            id,
            peer,
            stream,
            settings,
            recognizer,
            stop,
            stats: SessionStats::default(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Run the request loop.
    ///
    /// Errors end only this session; [`GestureError::kind`] tells the
    /// caller how to report them.
    pub async fn run(&mut self) -> Result<SessionEnd> {
        let mut buffer = GestureBuffer::new(self.settings.buffer, self.recognizer.clone());

        loop {
            let request = match self.next_request().await? {
                Incoming::Request(request) => request,
                Incoming::Closed => return Ok(SessionEnd::PeerClosed),
                Incoming::Stopped => return Ok(SessionEnd::Stopped),
            };

            let label = match request {
                Request::NoFrame => {
                    self.stats.empty += 1;
                    NO_HAND_DETECTED
                }
                Request::Frame(payload) => match FrameCodec::decode(&payload) {
                    Ok(frame) => {
                        let (returned, result) = tokio::task::spawn_blocking(move || {
                            let result = buffer.observe(frame);
                            (buffer, result)
                        })
                        .await?;
                        buffer = returned;

                        if let RecognitionResult::Gesture(_) = result {
                            self.stats.gestures += 1;
                        }
                        result.as_str()
                    }
                    Err(e) if !self.settings.strict_frames => {
                        warn!(session = self.id, peer = %self.peer, error = %e, "Skipping undecodable frame");
                        self.stats.malformed += 1;
                        NO_GESTURE_RECOGNIZED
                    }
                    Err(e) => return Err(e),
                },
            };

            trace!(session = self.id, label, "Responding");
            let framing = self.settings.response_framing;
            bounded(
                self.settings.read_timeout,
                write_response(&mut self.stream, label, framing),
            )
            .await?;
            self.stats.requests += 1;
        }
    }

    /// Wait for the next request.
    ///
    /// Only the wait for the first prefix byte races the stop flag, and a
    /// byte already buffered wins that race. Once a request has started
    /// arriving it is read to the end and answered.
    async fn next_request(&mut self) -> Result<Incoming> {
        let timeout = self.settings.read_timeout;

        let first = tokio::select! {
            biased;
            first = bounded(timeout, recv_exact(&mut self.stream, 1)) => first?,
            _ = self.stop.stopped() => return Ok(Incoming::Stopped),
        };

        let Some(first) = first else {
            return Ok(Incoming::Closed);
        };
        let length = bounded(timeout, read_length_after(&mut self.stream, first[0])).await?;

        if length == 0 {
            return Ok(Incoming::Request(Request::NoFrame));
        }

        debug!(session = self.id, bytes = length, "Reading frame");
        let payload = bounded(
            timeout,
            read_payload(&mut self.stream, length, self.settings.max_payload_size),
        )
        .await?;

        Ok(Incoming::Request(Request::from_payload(payload)))
    }
}

async fn bounded<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| GestureError::Timeout(limit))?
}
