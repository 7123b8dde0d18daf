//! # Telemetry Bridge Library
//!
//! Relay sensor and GPS telemetry from a serial-attached Arduino to any number
//! of live subscribers.
//!
//! The board prints one comma-separated line per reading. This library finds
//! the board, reads and validates those lines, keeps a rolling history of GPS
//! fixes, and publishes `{current, history}` events through a
//! [`BroadcastHub`](broadcast::BroadcastHub). A transport (websocket, HTTP)
//! subscribes to the hub or polls its latest state.
//!
//! ```no_run
//! use std::sync::Arc;
//! use telemetry_bridge::broadcast::BroadcastHub;
//! use telemetry_bridge::config::Config;
//! use telemetry_bridge::pipeline::Pipeline;
//! use telemetry_bridge::serial::{LinkManager, SerialConnector};
//! use telemetry_bridge::shutdown::ShutdownSignal;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let hub = Arc::new(BroadcastHub::new(config.pipeline.subscriber_buffer));
//!     let pipeline = Pipeline::new(&config.pipeline, Arc::clone(&hub));
//!     let shutdown = ShutdownSignal::new();
//!
//!     let manager = LinkManager::new(
//!         SerialConnector::new(config.serial.clone()),
//!         &config,
//!         pipeline,
//!         shutdown.listener(),
//!     );
//!     let link = tokio::spawn(manager.run());
//!
//!     let mut events = hub.subscribe();
//!     if let Some(event) = events.recv().await {
//!         println!("{}", event.to_json()?);
//!     }
//!
//!     shutdown.trigger();
//!     link.await??;
//!     Ok(())
//! }
//! ```

pub mod broadcast;
pub mod config;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod serial;
pub mod shutdown;
pub mod telemetry;
