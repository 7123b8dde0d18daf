//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section and field is optional; missing values take the defaults
//! below, so an empty file is a valid configuration.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub reconnect: ReconnectConfig,
    pub pipeline: PipelineConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Substrings matched against each port's description
    #[serde(default = "default_device_patterns")]
    pub device_patterns: Vec<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    /// Pause between polls when no data is available
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_read_chunk_size")]
    pub read_chunk_size: usize,
}

/// Reconnection backoff configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReconnectConfig {
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,

    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,

    /// 0 retries forever
    #[serde(default)]
    pub max_attempts: u32,
}

/// Frame processing and distribution configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,

    #[serde(default = "default_subscriber_buffer")]
    pub subscriber_buffer: usize,

    /// Published samples between statistics log lines
    #[serde(default = "default_stats_log_interval")]
    pub stats_log_interval: u64,
}

// Default value functions
fn default_device_patterns() -> Vec<String> { vec!["Arduino".to_string(), "CH340".to_string()] }
fn default_baud_rate() -> u32 { 9600 }
fn default_read_timeout_ms() -> u64 { 1000 }
fn default_write_timeout_ms() -> u64 { 1000 }
fn default_poll_interval_ms() -> u64 { 10 }
fn default_read_chunk_size() -> usize { 256 }

fn default_initial_interval_ms() -> u64 { 1000 }
fn default_max_interval_ms() -> u64 { 30000 }

fn default_history_capacity() -> usize { crate::telemetry::DEFAULT_HISTORY_CAPACITY }
fn default_max_frame_len() -> usize { crate::frame::protocol::DEFAULT_MAX_FRAME_LEN }
fn default_subscriber_buffer() -> usize { crate::broadcast::DEFAULT_SUBSCRIBER_BUFFER }
fn default_stats_log_interval() -> u64 { 1000 }

/// Baud rates the sensor sketch can be flashed with
const SUPPORTED_BAUD_RATES: &[u32] = &[300, 1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200];

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device_patterns: default_device_patterns(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            write_timeout_ms: default_write_timeout_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            read_chunk_size: default_read_chunk_size(),
        }
    }
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            max_attempts: 0,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            max_frame_len: default_max_frame_len(),
            subscriber_buffer: default_subscriber_buffer(),
            stats_log_interval: default_stats_log_interval(),
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl ReconnectConfig {
    /// Delay before reconnect attempt number `attempt` (1-based)
    ///
    /// Doubles from `initial_interval_ms` and saturates at `max_interval_ms`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(31);
        let delay = self.initial_interval_ms.saturating_mul(1u64 << shift);
        Duration::from_millis(delay.min(self.max_interval_ms))
    }

    /// Whether another attempt is allowed after `attempts` failures
    pub fn allows(&self, attempts: u32) -> bool {
        self.max_attempts == 0 || attempts < self.max_attempts
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use telemetry_bridge::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        let serial = &self.serial;

        if serial.device_patterns.is_empty() {
            return Err(invalid("device_patterns cannot be empty"));
        }

        if serial.device_patterns.iter().any(|p| p.trim().is_empty()) {
            return Err(invalid("device_patterns cannot contain empty patterns"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate must be one of: {}",
                SUPPORTED_BAUD_RATES.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
            )));
        }

        // Validate timing fields
        if serial.read_timeout_ms == 0 || serial.read_timeout_ms > 10000 {
            return Err(invalid("read_timeout_ms must be between 1 and 10000"));
        }

        if serial.write_timeout_ms == 0 || serial.write_timeout_ms > 10000 {
            return Err(invalid("write_timeout_ms must be between 1 and 10000"));
        }

        if serial.poll_interval_ms == 0 || serial.poll_interval_ms > 1000 {
            return Err(invalid("poll_interval_ms must be between 1 and 1000"));
        }

        if serial.read_chunk_size == 0 || serial.read_chunk_size > 65536 {
            return Err(invalid("read_chunk_size must be between 1 and 65536"));
        }

        let reconnect = &self.reconnect;

        if reconnect.initial_interval_ms == 0 || reconnect.initial_interval_ms > 60000 {
            return Err(invalid("initial_interval_ms must be between 1 and 60000"));
        }

        if reconnect.max_interval_ms < reconnect.initial_interval_ms
            || reconnect.max_interval_ms > 300000
        {
            return Err(invalid(
                "max_interval_ms must be between initial_interval_ms and 300000",
            ));
        }

        let pipeline = &self.pipeline;

        if pipeline.history_capacity == 0 {
            return Err(invalid("history_capacity must be greater than 0"));
        }

        if pipeline.max_frame_len < 16 || pipeline.max_frame_len > 65536 {
            return Err(invalid("max_frame_len must be between 16 and 65536"));
        }

        if pipeline.subscriber_buffer == 0 {
            return Err(invalid("subscriber_buffer must be greater than 0"));
        }

        if pipeline.stats_log_interval == 0 {
            return Err(invalid("stats_log_interval must be greater than 0"));
        }

        Ok(())
    }
}

fn invalid(msg: impl std::fmt::Display) -> BridgeError {
    BridgeError::Config(toml::de::Error::custom(msg))
}
