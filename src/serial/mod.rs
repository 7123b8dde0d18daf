//! # Serial Communication Module
//!
//! Owns the link to the sensor board.
//!
//! This module handles:
//! - Finding the board among the system's serial ports
//! - Opening it at the configured baud rate (9600 by default)
//! - The read loop feeding the ingestion pipeline
//! - Fault detection and reconnection with capped exponential backoff
//! - Cooperative shutdown
//!
//! ## Link States
//!
//! ```text
//! Disconnected -> Connecting -> Connected
//!                     |             | I/O fault
//!                     v             v
//!                  Reconnecting <---+
//!                     |  attempts exhausted / shutdown
//!                     v
//!                  Disconnected
//! ```

pub mod discovery;
pub mod port_trait;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{Config, ReconnectConfig, SerialConfig};
use crate::error::{BridgeError, Result};
use crate::pipeline::{Pipeline, PipelineStats};
use crate::shutdown::ShutdownListener;

pub use discovery::{find_matching_port, PortCandidate};
pub use port_trait::{LinkConnector, SerialLink, TokioSerialLink};

/// Connection state of the serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No device bound
    Disconnected,
    /// First connection attempt in progress
    Connecting,
    /// Link open, read loop running
    Connected,
    /// Link lost or never opened, retrying with backoff
    Reconnecting,
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LinkState::Disconnected => "disconnected",
            LinkState::Connecting => "connecting",
            LinkState::Connected => "connected",
            LinkState::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

/// Production connector: discovery by description, then open
#[derive(Debug, Clone)]
pub struct SerialConnector {
    config: SerialConfig,
}

impl SerialConnector {
    pub fn new(config: SerialConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LinkConnector for SerialConnector {
    /// Open the first port whose description matches a configured pattern
    ///
    /// # Errors
    ///
    /// - `DeviceNotFound`: no port matched
    /// - `Serial`: enumeration failed, or the matched port could not be opened
    async fn connect(&mut self) -> Result<Box<dyn SerialLink>> {
        let candidates = discovery::list_candidates()
            .map_err(|e| BridgeError::Serial(format!("Failed to enumerate serial ports: {}", e)))?;

        let port = find_matching_port(&candidates, &self.config.device_patterns)
            .ok_or_else(|| BridgeError::DeviceNotFound(self.config.device_patterns.join(", ")))?;

        info!("Found sensor board at {} ({})", port.name, port.description);
        let link = TokioSerialLink::open(&port.name, &self.config).await?;
        Ok(Box::new(link))
    }
}

/// Why the read loop returned
enum ReadExit {
    Shutdown,
    Fault(std::io::Error),
}

/// Serial link lifecycle manager
///
/// Runs on a dedicated task and is the only writer of samples: everything it
/// reads goes through the [`Pipeline`] into the broadcast hub.
pub struct LinkManager<C: LinkConnector> {
    connector: C,
    serial: SerialConfig,
    reconnect: ReconnectConfig,
    pipeline: Pipeline,
    state: watch::Sender<LinkState>,
    shutdown: ShutdownListener,
}

impl<C: LinkConnector> LinkManager<C> {
    pub fn new(connector: C, config: &Config, pipeline: Pipeline, shutdown: ShutdownListener) -> Self {
        let (state, _) = watch::channel(LinkState::Disconnected);
        Self {
            connector,
            serial: config.serial.clone(),
            reconnect: config.reconnect.clone(),
            pipeline,
            state,
            shutdown,
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    /// Receiver notified on every state transition
    pub fn watch_state(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// Single connection attempt
    ///
    /// Leaves retry policy to the caller. Failures are returned, never panic.
    pub async fn connect(&mut self) -> Result<Box<dyn SerialLink>> {
        self.set_state(LinkState::Connecting);
        self.connector.connect().await
    }

    /// Run until shutdown or until reconnect attempts are exhausted
    ///
    /// On return the link handle is closed, every subscriber registration is
    /// released and the state is `Disconnected`.
    ///
    /// # Errors
    ///
    /// Returns `ReconnectExhausted` once `max_attempts` consecutive connection
    /// attempts failed. I/O faults on an open link only trigger reconnection.
    pub async fn run(mut self) -> Result<PipelineStats> {
        let mut failures: u32 = 0;
        let mut next_state = LinkState::Connecting;

        let outcome = loop {
            self.set_state(next_state);

            let connected = tokio::select! {
                biased;
                _ = self.shutdown.wait() => break Ok(()),
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(link) => {
                    failures = 0;
                    info!("Connected to {} at {} baud", link.name(), self.serial.baud_rate);
                    self.set_state(LinkState::Connected);

                    match self.read_loop(link).await {
                        ReadExit::Shutdown => break Ok(()),
                        ReadExit::Fault(e) => {
                            warn!("Serial error: {}", e);
                            self.pipeline.reset_partial_frame();
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    warn!("Connection attempt {} failed: {}", failures, e);
                    if !self.reconnect.allows(failures) {
                        break Err(BridgeError::ReconnectExhausted(failures));
                    }
                }
            }

            next_state = LinkState::Reconnecting;
            self.set_state(next_state);

            let delay = self.reconnect.backoff(failures.max(1));
            debug!("Reconnecting in {:?}", delay);
            if self.pause(delay).await {
                break Ok(());
            }
        };

        self.pipeline.hub().close();
        self.set_state(LinkState::Disconnected);
        self.pipeline.log_stats();
        info!("Serial link stopped");

        outcome.map(|()| self.pipeline.stats())
    }

    /// Read until a fault or shutdown; the link is closed when this returns
    async fn read_loop(&mut self, mut link: Box<dyn SerialLink>) -> ReadExit {
        let mut buf = vec![0u8; self.serial.read_chunk_size];
        let read_timeout = self.serial.read_timeout();
        let poll_interval = self.serial.poll_interval();

        loop {
            let read = tokio::select! {
                biased;
                _ = self.shutdown.wait() => return ReadExit::Shutdown,
                result = tokio::time::timeout(read_timeout, link.read(&mut buf)) => result,
            };

            match read {
                Ok(Ok(0)) => {
                    if self.pause(poll_interval).await {
                        return ReadExit::Shutdown;
                    }
                }
                Ok(Ok(n)) => {
                    self.pipeline.feed(&buf[..n]);
                }
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => {}
                Ok(Err(e)) => return ReadExit::Fault(e),
                // Read timeout elapsed with no data
                Err(_) => {}
            }
        }
    }

    /// Sleep for `delay`; returns `true` if shutdown arrived first
    async fn pause(&mut self, delay: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.wait() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }

    fn set_state(&self, state: LinkState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!("Link state {} -> {}", previous, state);
        }
    }
}
