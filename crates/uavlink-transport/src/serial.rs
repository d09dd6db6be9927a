//! Serial port transport for vehicle telemetry.
//!
//! This module provides [`SerialTransport`], which implements the
//! [`ByteTransport`] trait for USB telemetry radios and direct serial
//! links to the autopilot. Typical hardware:
//!
//! - SiK telemetry radios (3DR/RFD900), usually 57600 baud
//! - Direct FTDI cable to the autopilot TELEM port, 57600 or 115200 baud
//! - USB connection to the autopilot itself, 115200 baud
//!
//! # Example
//!
//! ```no_run
//! use uavlink_transport::SerialTransport;
//! use uavlink_core::ByteTransport;
//!
//! # async fn example() -> uavlink_core::Result<()> {
//! let transport = SerialTransport::new("/dev/ttyUSB0", 57600);
//! transport.open().await?;
//!
//! transport.send_buffer(b"heartbeat").await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use uavlink_core::error::{Error, Result};
use uavlink_core::transport::ByteTransport;

/// Serial port configuration.
///
/// Defaults are appropriate for SiK telemetry radios:
/// - 57600 baud
/// - 8 data bits
/// - 1 stop bit
/// - No parity
/// - No flow control
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (e.g., 57600, 115200, 921600)
    pub baud_rate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1)
    pub stop_bits: StopBits,
    /// Parity checking (typically None)
    pub parity: Parity,
    /// Flow control (typically None; RTS/CTS on some autopilot TELEM ports)
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: uavlink_core::identity::DEFAULT_USB_BAUD,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => tokio_serial::DataBits::Five,
            DataBits::Six => tokio_serial::DataBits::Six,
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// Serial port [`ByteTransport`].
///
/// The stream is split on open so the read loop can block on
/// [`read_block`](ByteTransport::read_block) while sends go through the
/// write half.
pub struct SerialTransport {
    /// Serial port path (e.g., "/dev/ttyUSB0" on Linux, "COM3" on Windows)
    port_name: String,
    /// Port configuration applied in `open()`.
    config: SerialConfig,
    /// Read half of the stream, `None` until `open()` / after `close()`.
    reader: Mutex<Option<ReadHalf<SerialStream>>>,
    /// Write half of the stream, `None` until `open()` / after `close()`.
    writer: Mutex<Option<WriteHalf<SerialStream>>>,
}

impl SerialTransport {
    /// Create a transport for the given port and baud rate with default
    /// framing (8 data bits, 1 stop bit, no parity, no flow control).
    pub fn new(port: impl Into<String>, baud_rate: u32) -> Self {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::with_config(port, config)
    }

    /// Create a transport with full configuration control.
    pub fn with_config(port: impl Into<String>, config: SerialConfig) -> Self {
        Self {
            port_name: port.into(),
            config,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    /// Get the name of the serial port.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[async_trait]
impl ByteTransport for SerialTransport {
    async fn open(&self) -> Result<()> {
        tracing::debug!(
            port = %self.port_name,
            baud_rate = self.config.baud_rate,
            data_bits = ?self.config.data_bits,
            stop_bits = ?self.config.stop_bits,
            parity = ?self.config.parity,
            flow_control = ?self.config.flow_control,
            "Opening serial port"
        );

        let serial_stream = tokio_serial::new(&self.port_name, self.config.baud_rate)
            .data_bits(self.config.data_bits.into())
            .stop_bits(self.config.stop_bits.into())
            .parity(self.config.parity.into())
            .flow_control(self.config.flow_control.into())
            .open_native_async()
            .map_err(|e| {
                tracing::error!(port = %self.port_name, error = %e, "Failed to open serial port");
                Error::Transport(format!(
                    "Failed to open serial port {}: {}",
                    self.port_name, e
                ))
            })?;

        tracing::info!(
            port = %self.port_name,
            baud_rate = self.config.baud_rate,
            "Serial port opened successfully"
        );

        let (read_half, write_half) = tokio::io::split(serial_stream);
        *self.reader.lock().await = Some(read_half);
        *self.writer.lock().await = Some(write_half);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let reader = self.reader.lock().await.take();
        let writer = self.writer.lock().await.take();

        if let Some(mut write_half) = writer {
            tracing::debug!(port = %self.port_name, "Closing serial port");

            // Flush any pending data before closing
            if let Err(e) = write_half.flush().await {
                tracing::warn!(
                    port = %self.port_name,
                    error = %e,
                    "Failed to flush before closing (continuing anyway)"
                );
            }

            tracing::info!(port = %self.port_name, "Serial port closed");
        }
        drop(reader);

        Ok(())
    }

    async fn read_block(&self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(Error::NotConnected)?;

        let n = reader.read(buf).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to receive data");
            map_io_error(e)
        })?;

        tracing::trace!(port = %self.port_name, bytes = n, "Received data");
        Ok(n)
    }

    async fn send_buffer(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(port = %self.port_name, bytes = data.len(), "Sending data");

        writer.write_all(data).await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to send data");
            map_io_error(e)
        })?;

        // Flush to ensure data is transmitted immediately
        writer.flush().await.map_err(|e| {
            tracing::error!(port = %self.port_name, error = %e, "Failed to flush serial port");
            Error::Io(e)
        })?;

        Ok(())
    }
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
///
/// A USB radio being unplugged surfaces as BrokenPipe or NotConnected.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
