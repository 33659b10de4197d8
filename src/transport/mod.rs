//! TCP transport: the server's listening socket and the client's dialer.

mod tcp;

pub use tcp::{Connector, GestureListener, TcpConnector, LISTEN_BACKLOG};
