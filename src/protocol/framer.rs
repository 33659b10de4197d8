//! Async framing over a byte stream.
//!
//! Both ends of the link use these helpers: the server reads requests with
//! [`read_length`] / [`read_payload`] and answers with [`write_response`];
//! the client sends with [`send_frame`] / [`send_no_frame`] and waits with
//! [`read_response`]. The protocol is strictly one request, one response.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::frame::build_message;
use super::wire_format::{decode_length, validate_length, ResponseFraming, LENGTH_PREFIX_SIZE};
use crate::error::{GestureError, Result};

/// Upper bound on buffer growth per read, so a declared length is only
/// backed by memory as its bytes actually arrive.
const READ_CHUNK: usize = 64 * 1024;

/// Read exactly `n` bytes.
///
/// Returns:
/// - `Ok(Some(bytes))` once all `n` bytes arrived
/// - `Ok(None)` if the peer closed before sending a single byte
/// - `Err(Framing)` if the peer closed part-way through
pub async fn recv_exact<R>(reader: &mut R, n: usize) -> Result<Option<Bytes>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::with_capacity(n.min(READ_CHUNK));

    while buf.len() < n {
        let wanted = n - buf.len();
        buf.reserve(wanted.min(READ_CHUNK));

        let read = (&mut *reader).take(wanted as u64).read_buf(&mut buf).await?;
        if read == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(GestureError::Framing {
                expected: n,
                received: buf.len(),
            });
        }
    }

    Ok(Some(buf.freeze()))
}

/// Read the 4-byte length prefix of the next message.
///
/// `Ok(None)` means an orderly close between messages.
pub async fn read_length<R>(reader: &mut R) -> Result<Option<u32>>
where
    R: AsyncRead + Unpin,
{
    match recv_exact(reader, LENGTH_PREFIX_SIZE).await? {
        Some(prefix) => Ok(decode_length(&prefix)),
        None => Ok(None),
    }
}

/// Finish a length prefix whose first byte was already read.
///
/// Lets a caller wait for the start of a message separately (for example
/// racing a stop signal) without losing bytes of a prefix in flight.
pub async fn read_length_after<R>(reader: &mut R, first: u8) -> Result<u32>
where
    R: AsyncRead + Unpin,
{
    let rest = recv_exact(reader, LENGTH_PREFIX_SIZE - 1)
        .await?
        .ok_or(GestureError::Framing {
            expected: LENGTH_PREFIX_SIZE,
            received: 1,
        })?;

    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    prefix[0] = first;
    prefix[1..].copy_from_slice(&rest);
    Ok(u32::from_be_bytes(prefix))
}

/// Read a payload whose length was already declared.
///
/// A close before the first payload byte is still a short read here.
pub async fn read_payload<R>(reader: &mut R, length: u32, max_payload_size: u32) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    validate_length(length, max_payload_size)?;
    let expected = length as usize;

    recv_exact(reader, expected)
        .await?
        .ok_or(GestureError::Framing {
            expected,
            received: 0,
        })
}

/// Send one length-prefixed frame payload in a single write.
pub async fn send_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let message = build_message(payload)?;
    writer.write_all(&message).await?;
    writer.flush().await?;
    Ok(())
}

/// Send the zero-length "no frame this tick" sentinel.
pub async fn send_no_frame<W>(writer: &mut W) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    send_frame(writer, &[]).await
}

/// Write a response label using the configured framing.
pub async fn write_response<W>(writer: &mut W, label: &str, framing: ResponseFraming) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    match framing {
        ResponseFraming::LengthPrefixed => send_frame(writer, label.as_bytes()).await,
        ResponseFraming::Raw => {
            writer.write_all(label.as_bytes()).await?;
            writer.flush().await?;
            Ok(())
        }
    }
}

/// Read one response label.
///
/// In raw mode there is no length to honour, so the label is whatever a
/// single read returns (up to `max_response_size` bytes).
pub async fn read_response<R>(
    reader: &mut R,
    framing: ResponseFraming,
    max_response_size: u32,
) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let bytes = match framing {
        ResponseFraming::LengthPrefixed => {
            let length = read_length(reader)
                .await?
                .ok_or(GestureError::ConnectionClosed)?;
            read_payload(reader, length, max_response_size).await?
        }
        ResponseFraming::Raw => {
            let mut buf = vec![0u8; max_response_size as usize];
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Err(GestureError::ConnectionClosed);
            }
            buf.truncate(n);
            Bytes::from(buf)
        }
    };

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
