//! Trait abstraction for serial link operations to enable testing

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPort, SerialPortBuilderExt};
use tracing::debug;

use crate::config::SerialConfig;
use crate::error::{BridgeError, Result};

/// An open, readable serial link
#[async_trait]
pub trait SerialLink: Send {
    /// Read available bytes into `buf`
    ///
    /// `Ok(0)` means no data right now. A link that has gone away must
    /// report an error (e.g. `UnexpectedEof`) so the caller can reconnect.
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Device name for logging (e.g. `/dev/ttyUSB0`)
    fn name(&self) -> &str;
}

/// Discovers and opens a [`SerialLink`]
#[async_trait]
pub trait LinkConnector: Send {
    async fn connect(&mut self) -> Result<Box<dyn SerialLink>>;
}

/// Wrapper around tokio_serial::SerialStream that implements SerialLink
pub struct TokioSerialLink {
    port: tokio_serial::SerialStream,
    name: String,
}

impl std::fmt::Debug for TokioSerialLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioSerialLink")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TokioSerialLink {
    /// Open a serial port with the configured link settings
    ///
    /// Stale bytes in both directions are discarded, then pending output is
    /// drained within the write timeout.
    ///
    /// # Arguments
    ///
    /// * `path` - Device path (e.g., "/dev/ttyUSB0" or "COM3")
    /// * `config` - Baud rate and timeouts
    pub async fn open(path: &str, config: &SerialConfig) -> Result<Self> {
        let mut port = tokio_serial::new(path, config.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .timeout(config.read_timeout())
            .open_native_async()
            .map_err(|e| BridgeError::Serial(format!("Failed to open {}: {}", path, e)))?;

        port.clear(tokio_serial::ClearBuffer::All)
            .map_err(|e| BridgeError::Serial(format!("Failed to clear {}: {}", path, e)))?;

        match tokio::time::timeout(config.write_timeout(), port.flush()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(BridgeError::Serial(format!("Failed to flush {}: {}", path, e)));
            }
            Err(_) => {
                return Err(BridgeError::Serial(format!("Timed out flushing {}", path)));
            }
        }

        debug!("Opened {} at {} baud", path, config.baud_rate);
        Ok(Self {
            port,
            name: path.to_string(),
        })
    }
}

#[async_trait]
impl SerialLink for TokioSerialLink {
    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        closed_as_error(self.port.read(buf).await)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Turn an end-of-stream read into an error
///
/// A pending read means no data; `Ok(0)` from the stream means the device
/// hung up (unplugged USB adapter), and every later read returns it at once.
fn closed_as_error(result: io::Result<usize>) -> io::Result<usize> {
    match result {
        Ok(0) => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "serial device closed",
        )),
        other => other,
    }
}
