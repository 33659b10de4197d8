//! Accept loop with a bounded worker set.
//!
//! Each accepted connection needs one of `max_clients` semaphore permits
//! before its session starts. While all permits are taken the acceptor
//! holds the connection it just accepted and stops accepting; further
//! clients queue in the listen backlog.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use super::session::{SessionEnd, SessionHandler, SessionSettings};
use crate::config::ServerConfig;
use crate::error::{ErrorKind, GestureError, Result};
use crate::recognition::Recognizer;
use crate::shutdown::StopFlag;
use crate::transport::GestureListener;

const ACCEPT_ERROR_DELAY: Duration = Duration::from_millis(100);

/// Stops a running [`ConnectionPool`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PoolHandle {
    stop: StopFlag,
}

impl PoolHandle {
    /// Stop accepting, end idle sessions, and let busy sessions finish
    /// their current message.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_stopped()
    }
}

/// TCP server dispatching connections to [`SessionHandler`]s.
pub struct ConnectionPool {
    listener: GestureListener,
    recognizer: Recognizer,
    settings: SessionSettings,
    max_clients: u32,
    workers: Arc<Semaphore>,
    stop: StopFlag,
}

impl ConnectionPool {
    /// Validate `config` and bind its address.
    pub async fn bind(config: &ServerConfig, recognizer: Recognizer) -> Result<Self> {
        config.validate()?;
        let max_clients = u32::try_from(config.max_clients).map_err(|_| {
            GestureError::Config(format!("max_clients {} out of range", config.max_clients))
        })?;
        let listener = GestureListener::bind(&config.bind_addr()).await?;

        Ok(Self {
            listener,
            recognizer,
            settings: SessionSettings::from(config),
            max_clients,
            workers: Arc::new(Semaphore::new(config.max_clients)),
            stop: StopFlag::new(),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            stop: self.stop.clone(),
        }
    }

    /// Sessions currently holding a worker slot.
    pub fn active_sessions(&self) -> usize {
        (self.max_clients as usize).saturating_sub(self.workers.available_permits())
    }

    /// Serve until [`PoolHandle::stop`] is called.
    ///
    /// Returns once the listener is closed and every session has released
    /// its worker slot.
    pub async fn run(self) -> Result<()> {
        let Self {
            listener,
            recognizer,
            settings,
            max_clients,
            workers,
            stop,
        } = self;

        let local = listener.local_addr()?;
        info!(addr = %local, max_clients, "Listening");

        let mut stopped = stop.subscribe();
        let mut next_id: u64 = 0;

        loop {
            let (stream, peer) = tokio::select! {
                biased;
                _ = stopped.stopped() => break,
                accepted = listener.accept() => match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        // Usually fd exhaustion; give sessions a moment to close.
                        warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_DELAY).await;
                        continue;
                    }
                },
            };

            next_id += 1;
            let id = next_id;
            debug!(session = id, %peer, "Connection accepted");

            if workers.available_permits() == 0 {
                info!(session = id, %peer, "All workers busy, connection waiting");
            }

            let permit = tokio::select! {
                biased;
                _ = stopped.stopped() => break,
                permit = workers.clone().acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let mut session = SessionHandler::new(
                id,
                peer,
                stream,
                settings,
                recognizer.clone(),
                stop.subscribe(),
            );

            tokio::spawn(async move {
                let _permit = permit;
                info!(session = id, %peer, "Session started");

                let outcome = session.run().await;
                let stats = session.stats();
                match outcome {
                    Ok(SessionEnd::PeerClosed) => {
                        info!(session = id, %peer, requests = stats.requests, "Client disconnected")
                    }
                    Ok(SessionEnd::Stopped) => {
                        info!(session = id, %peer, requests = stats.requests, "Session stopped")
                    }
                    Err(e) => match e.kind() {
                        ErrorKind::Fault => error!(
                            session = id, %peer, requests = stats.requests, error = %e,
                            "Session failed"
                        ),
                        kind => warn!(
                            session = id, %peer, requests = stats.requests, ?kind, error = %e,
                            "Session closed"
                        ),
                    },
                }
            });
        }

        drop(listener);
        info!("Listener closed, waiting for sessions to finish");

        // Every slot back means every session has ended.
        let _all = workers.acquire_many(max_clients).await;
        info!("Server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;
    use crate::recognition::{Classifier, HandLandmarks, InputTensor, LandmarkDetector};

    struct NoHand;

    impl LandmarkDetector for NoHand {
        fn detect(&self, _image: &Frame) -> Option<HandLandmarks> {
            None
        }
    }

    impl Classifier for NoHand {
        fn predict(&self, _input: &InputTensor) -> Vec<f32> {
            Vec::new()
        }
    }

    fn config() -> ServerConfig {
        ServerConfig {
            port: 0,
            max_clients: 2,
            ..ServerConfig::default()
        }
    }

    fn recognizer() -> Recognizer {
        Recognizer::new(Arc::new(NoHand), Arc::new(NoHand))
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_config() {
        let bad = ServerConfig {
            max_clients: 0,
            ..config()
        };
        assert!(ConnectionPool::bind(&bad, recognizer()).await.is_err());
    }

    #[tokio::test]
    async fn test_bind_rejects_oversized_worker_set() {
        let huge = ServerConfig {
            max_clients: usize::MAX,
            ..config()
        };
        let err = ConnectionPool::bind(&huge, recognizer())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, GestureError::Config(_)));
    }

    #[tokio::test]
    async fn test_stop_without_clients() {
        let pool = ConnectionPool::bind(&config(), recognizer()).await.unwrap();
        assert_ne!(pool.local_addr().unwrap().port(), 0);
        assert_eq!(pool.active_sessions(), 0);

        let handle = pool.handle();
        assert!(handle.is_running());
        let server = tokio::spawn(pool.run());

        handle.stop();
        assert!(!handle.is_running());
        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_listener_closed_after_stop() {
        let pool = ConnectionPool::bind(&config(), recognizer()).await.unwrap();
        let addr = pool.local_addr().unwrap();
        let handle = pool.handle();

        handle.stop();
        pool.run().await.unwrap();

        assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    }
}
