//! # Telemetry Bridge
//!
//! Relay sensor and GPS telemetry from a serial-attached Arduino to live
//! subscribers.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Parse command line, load configuration
//!    - Set up logging with tracing subscriber
//!    - Spawn the serial link task (discovery, read loop, reconnection)
//!
//! 2. **Main Loop**
//!    - Log link state transitions
//!    - Log every published event as JSON at debug level
//!    - Handle Ctrl+C for graceful shutdown
//!
//! 3. **Graceful Shutdown**
//!    - Signal the link task, close the port, release subscribers
//!    - Log pipeline counters
//!
//! # Examples
//!
//! ```bash
//! RUST_LOG=telemetry_bridge=debug cargo run --release -- --config config/default.toml
//! ```
//!
//! Expected output:
//! ```text
//! INFO telemetry_bridge: Telemetry Bridge v0.1.0 starting...
//! INFO telemetry_bridge::serial: Found sensor board at /dev/ttyUSB0 (USB2.0-Serial CH340)
//! INFO telemetry_bridge::serial: Connected to /dev/ttyUSB0 at 9600 baud
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use telemetry_bridge::broadcast::BroadcastHub;
use telemetry_bridge::config::Config;
use telemetry_bridge::pipeline::Pipeline;
use telemetry_bridge::serial::{LinkManager, SerialConnector};
use telemetry_bridge::shutdown::ShutdownSignal;
use telemetry_bridge::telemetry::TELEMETRY_EVENT_NAME;

/// Upper bound on waiting for the link task after Ctrl+C
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Parser)]
#[command(version, about = "Relay serial sensor telemetry to live subscribers")]
struct Args {
    /// Path to a TOML configuration file (built-in defaults if omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let (writer, _log_guard) = tracing_appender::non_blocking(std::io::stdout());
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Telemetry Bridge v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    info!(
        "Looking for devices matching [{}] at {} baud",
        config.serial.device_patterns.join(", "),
        config.serial.baud_rate
    );

    let hub = Arc::new(BroadcastHub::new(config.pipeline.subscriber_buffer));
    let pipeline = Pipeline::new(&config.pipeline, Arc::clone(&hub));
    let shutdown = ShutdownSignal::new();

    let manager = LinkManager::new(
        SerialConnector::new(config.serial.clone()),
        &config,
        pipeline,
        shutdown.listener(),
    );
    let mut link_state = manager.watch_state();
    let mut link_task = tokio::spawn(manager.run());

    let mut events = hub.subscribe();
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event.to_json() {
                Ok(json) => debug!(event = TELEMETRY_EVENT_NAME, "{}", json),
                Err(e) => warn!("Failed to serialize event: {}", e),
            }
        }
    });

    info!("Press Ctrl+C to exit");

    let mut finished = None;
    loop {
        tokio::select! {
            changed = link_state.changed() => {
                if changed.is_err() {
                    break;
                }
                info!("Serial link {}", *link_state.borrow_and_update());
            }

            result = &mut link_task => {
                finished = Some(result);
                break;
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    shutdown.trigger();

    let result = match finished {
        Some(result) => result,
        None => tokio::time::timeout(SHUTDOWN_TIMEOUT, link_task)
            .await
            .context("Serial link did not stop in time")?,
    };

    // Normally already closed by the link task; not if it panicked
    hub.close();
    logger_exited_cleanly(event_logger.await);

    let stats = result.context("Serial link task panicked")??;
    info!("Total samples published: {}", stats.samples_published);

    Ok(())
}

/// Log a failed event logger task; returns `false` if it did not finish
fn logger_exited_cleanly(result: std::result::Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Event logger task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_logger_exit_reports_panic() {
        let clean = tokio::spawn(async {});
        assert!(logger_exited_cleanly(clean.await));

        let panicked = tokio::spawn(async { panic!("logger crashed") });
        assert!(!logger_exited_cleanly(panicked.await));
    }

    #[test]
    fn test_args_without_config() {
        let args = Args::try_parse_from(["telemetry-bridge"]).unwrap();
        assert!(args.config.is_none());
    }

    #[test]
    fn test_args_with_config() {
        let args = Args::try_parse_from(["telemetry-bridge", "--config", "config/default.toml"]).unwrap();
        assert_eq!(args.config, Some(PathBuf::from("config/default.toml")));
    }

    #[test]
    fn test_shutdown_timeout_is_bounded() {
        assert!(SHUTDOWN_TIMEOUT <= Duration::from_secs(10));
    }
}
