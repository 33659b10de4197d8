//! TCP listener and connector.
//!
//! # Example
//!
//! ```ignore
//! use gesture_link::transport::{Connector, GestureListener, TcpConnector};
//!
//! let listener = GestureListener::bind("127.0.0.1:0").await?;
//! let connector = TcpConnector::new(listener.local_addr()?.to_string());
//! let client = connector.connect().await?;
//! let (server, peer) = listener.accept().await?;
//! ```

use std::future::Future;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::error::{GestureError, Result};

/// Pending-connection queue length passed to `listen(2)`.
pub const LISTEN_BACKLOG: u32 = 1024;

/// Listening socket with address reuse enabled, so a restarted server can
/// rebind while old connections sit in TIME_WAIT.
pub struct GestureListener {
    listener: TcpListener,
}

impl GestureListener {
    /// Resolve `addr` and bind to the first address that accepts.
    pub async fn bind(addr: &str) -> Result<Self> {
        let mut last_err = None;

        for candidate in tokio::net::lookup_host(addr).await? {
            match Self::bind_addr(candidate) {
                Ok(listener) => return Ok(listener),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            GestureError::Config(format!("{} did not resolve to any address", addr))
        }))
    }

    /// Bind to an already-resolved address.
    pub fn bind_addr(addr: SocketAddr) -> Result<Self> {
        let socket = match addr {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        let listener = socket.listen(LISTEN_BACKLOG)?;

        Ok(Self { listener })
    }

    /// Accept one connection.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr)> {
        let (stream, peer) = self.listener.accept().await?;
        stream.set_nodelay(true)?;
        Ok((stream, peer))
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

/// Opens a fresh connection to the server.
///
/// The client's retry loop only depends on this trait, so tests can drive
/// it with a connector that fails on demand.
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn connect(&self) -> impl Future<Output = Result<Self::Stream>> + Send;

    /// Human-readable target, for logs.
    fn target(&self) -> String;
}

/// Connects over TCP to a `host:port` address.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect(&self.addr)
            .await
            .map_err(|source| GestureError::Connect {
                addr: self.addr.clone(),
                source,
            })?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn target(&self) -> String {
        self.addr.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_bind_connect_accept() {
        let listener = GestureListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        assert_ne!(addr.port(), 0);

        let connector = TcpConnector::new(addr.to_string());
        let (client, accepted) = tokio::join!(connector.connect(), listener.accept());
        let mut client = client.unwrap();
        let (mut server, _peer) = accepted.unwrap();

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");
    }

    #[tokio::test]
    async fn test_rebind_same_port() {
        let first = GestureListener::bind("127.0.0.1:0").await.unwrap();
        let addr = first.local_addr().unwrap();
        drop(first);

        let second = GestureListener::bind_addr(addr).unwrap();
        assert_eq!(second.local_addr().unwrap(), addr);
    }

    #[tokio::test]
    async fn test_connect_refused_is_connect_failure() {
        let listener = GestureListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = TcpConnector::new(addr.to_string())
            .connect()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConnectFailure);
        assert!(err.to_string().contains(&addr.to_string()));
    }

    #[test]
    fn test_connector_target() {
        assert_eq!(TcpConnector::new("10.0.0.1:12345").target(), "10.0.0.1:12345");
    }
}
