//! Client side of the link.
//!
//! Two loops share one [`ClientLink`]:
//! - the connection loop dials the server, retrying on a fixed delay, and
//!   while connected runs the lockstep exchange (one frame out, one label
//!   back, never pipelined)
//! - the display loop renders the latest label on a fixed cadence,
//!   whether or not the link is up
//!
//! Each loop captures its own frames.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::source::{FrameSource, LabelDisplay};
use crate::codec::FrameCodec;
use crate::config::ClientConfig;
use crate::error::{GestureError, Result};
use crate::protocol::{read_response, send_frame, send_no_frame};
use crate::shutdown::{StopFlag, StopListener};
use crate::transport::{Connector, TcpConnector};

/// Observes and stops a [`ClientLink`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    stop: StopFlag,
    connected: Arc<AtomicBool>,
    label: watch::Receiver<String>,
}

impl LinkHandle {
    /// Ask every loop to finish.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn is_running(&self) -> bool {
        !self.stop.is_stopped()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Last label received from the server; empty before the first one.
    pub fn label(&self) -> String {
        self.label.borrow().clone()
    }

    /// Follow label updates.
    pub fn labels(&self) -> watch::Receiver<String> {
        self.label.clone()
    }
}

/// Connects a [`FrameSource`] to a gesture server.
pub struct ClientLink<C, F> {
    config: ClientConfig,
    connector: C,
    source: F,
    stop: StopFlag,
    connected: Arc<AtomicBool>,
    label: watch::Sender<String>,
}

impl<F: FrameSource> ClientLink<TcpConnector, F> {
    /// Link to `config.host:config.port` over TCP.
    pub fn new(config: ClientConfig, source: F) -> Self {
        let connector = TcpConnector::new(config.server_addr());
        Self::with_connector(config, connector, source)
    }
}

impl<C: Connector, F: FrameSource> ClientLink<C, F> {
    pub fn with_connector(config: ClientConfig, connector: C, source: F) -> Self {
        let (label, _) = watch::channel(String::new());
        Self {
            config,
            connector,
            source,
            stop: StopFlag::new(),
            connected: Arc::new(AtomicBool::new(false)),
            label,
        }
    }

    pub fn handle(&self) -> LinkHandle {
        LinkHandle {
            stop: self.stop.clone(),
            connected: self.connected.clone(),
            label: self.label.subscribe(),
        }
    }

    /// Run both loops until stopped.
    ///
    /// An error means the exchange hit a fault that is not a lost
    /// connection; the whole client is stopped in that case.
    pub async fn run<D: LabelDisplay>(&self, display: D) -> Result<()> {
        let (connection, ()) = tokio::join!(self.connection_loop(), self.display_loop(display));
        connection
    }

    /// Dial, exchange until the link drops, dial again.
    pub async fn connection_loop(&self) -> Result<()> {
        let mut stopped = self.stop.subscribe();
        let target = self.connector.target();
        let delay = self.config.retry_delay();
        let mut attempt: u64 = 0;

        while !stopped.is_stopped() {
            attempt += 1;
            debug!(%target, attempt, "Connecting");

            let connected = tokio::select! {
                biased;
                _ = stopped.stopped() => break,
                connected = self.connector.connect() => connected,
            };

            let stream = match connected {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(%target, attempt, error = %e, "Connection failed. Retrying in {:?}", delay);
                    tokio::select! {
                        biased;
                        _ = stopped.stopped() => break,
                        _ = tokio::time::sleep(delay) => continue,
                    }
                }
            };

            info!(%target, attempt, "Connected");
            attempt = 0;
            self.connected.store(true, Ordering::Release);
            let outcome = self.exchange(stream, &mut stopped).await;
            self.connected.store(false, Ordering::Release);

            match outcome {
                Ok(exchanged) => {
                    info!(%target, exchanged, "Disconnected");
                }
                Err(e) if e.is_disconnect() => {
                    warn!(%target, kind = ?e.kind(), error = %e, "Connection lost");
                }
                Err(e) => {
                    error!(%target, error = %e, "Client loop fault, shutting down");
                    self.stop.stop();
                    return Err(e);
                }
            }
        }

        Ok(())
    }

    /// Lockstep request/response until stopped or the link fails.
    ///
    /// Returns the number of completed exchanges.
    async fn exchange(&self, mut stream: C::Stream, stopped: &mut StopListener) -> Result<u64> {
        let framing = self.config.response_framing;
        let response_timeout = self.config.response_timeout();
        let mut ticker = interval(self.config.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut exchanged = 0;

        loop {
            tokio::select! {
                biased;
                _ = stopped.stopped() => return Ok(exchanged),
                _ = ticker.tick() => {}
            }

            let payload = self.source.capture().map(|frame| FrameCodec::encode(&frame));
            match payload {
                Some(Ok(payload)) => send_frame(&mut stream, &payload).await?,
                Some(Err(e)) => {
                    debug!(error = %e, "Frame did not encode, sending empty request");
                    send_no_frame(&mut stream).await?;
                }
                None => send_no_frame(&mut stream).await?,
            }

            let label = tokio::time::timeout(
                response_timeout,
                read_response(&mut stream, framing, self.config.max_response_size),
            )
            .await
            .map_err(|_| GestureError::Timeout(response_timeout))??;

            self.label.send_replace(label);
            exchanged += 1;
        }
    }

    /// Render on a fixed cadence until stopped.
    async fn display_loop<D: LabelDisplay>(&self, mut display: D) {
        let mut stopped = self.stop.subscribe();
        let mut ticker = interval(self.config.frame_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = stopped.stopped() => break,
                _ = ticker.tick() => {}
            }

            let frame = self.source.capture();
            let label = self.label.borrow().clone();
            display.render(frame.as_ref(), &label, self.connected.load(Ordering::Acquire));
        }

        debug!("Display loop ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::io::DuplexStream;
    use tokio::time::Instant;

    use crate::frame::Frame;

    struct Blank;

    impl FrameSource for Blank {
        fn capture(&self) -> Option<Frame> {
            None
        }
    }

    #[derive(Clone, Default)]
    struct CountingDisplay {
        renders: Arc<Mutex<Vec<bool>>>,
    }

    impl LabelDisplay for CountingDisplay {
        fn render(&mut self, _frame: Option<&Frame>, _label: &str, connected: bool) {
            self.renders.lock().unwrap().push(connected);
        }
    }

    /// Refuses every attempt and records when each one was made.
    #[derive(Default)]
    struct Unreachable {
        attempts: Mutex<Vec<Instant>>,
    }

    impl Connector for Unreachable {
        type Stream = DuplexStream;

        async fn connect(&self) -> Result<DuplexStream> {
            self.attempts.lock().unwrap().push(Instant::now());
            Err(GestureError::Connect {
                addr: "unreachable".into(),
                source: std::io::ErrorKind::ConnectionRefused.into(),
            })
        }

        fn target(&self) -> String {
            "unreachable".into()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_spacing_while_display_keeps_running() {
        let link = Arc::new(ClientLink::with_connector(
            ClientConfig::default(),
            Unreachable::default(),
            Blank,
        ));
        let handle = link.handle();
        let display = CountingDisplay::default();

        let runner = {
            let link = link.clone();
            let display = display.clone();
            tokio::spawn(async move { link.run(display).await })
        };

        tokio::time::sleep(Duration::from_millis(10_500)).await;
        handle.stop();
        runner.await.unwrap().unwrap();

        let attempts = link.connector.attempts.lock().unwrap().clone();
        assert!(attempts.len() >= 3, "only {} attempts", attempts.len());
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(5));
        }

        let renders = display.renders.lock().unwrap();
        assert!(renders.len() > 100, "only {} renders", renders.len());
        assert!(renders.iter().all(|connected| !connected));
        assert!(!handle.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_retry_delay() {
        let link = ClientLink::with_connector(ClientConfig::default(), Unreachable::default(), Blank);
        let handle = link.handle();

        let started = Instant::now();
        let stopper = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            handle.stop();
        };
        let (result, ()) = tokio::join!(link.connection_loop(), stopper);

        result.unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(link.connector.attempts.lock().unwrap().len(), 1);
        assert!(!handle.is_running());
    }
}
