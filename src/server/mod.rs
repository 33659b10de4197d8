//! Gesture recognition server: the accept loop and per-connection sessions.

mod pool;
mod session;

pub use pool::{ConnectionPool, PoolHandle};
pub use session::{SessionEnd, SessionHandler, SessionSettings, SessionStats};
