//! TCP transport for vehicle telemetry.
//!
//! This module provides [`TcpTransport`], which implements the
//! [`ByteTransport`] trait for vehicles and telemetry bridges that accept
//! TCP connections (companion computers, SITL simulators, serial-to-IP
//! gateways).
//!
//! # Example
//!
//! ```no_run
//! use uavlink_transport::TcpTransport;
//! use uavlink_core::ByteTransport;
//!
//! # async fn example() -> uavlink_core::Result<()> {
//! let transport = TcpTransport::new("192.168.1.10:5763");
//! transport.open().await?;
//!
//! transport.send_buffer(b"heartbeat").await?;
//!
//! let mut buf = [0u8; 4096];
//! let n = transport.read_block(&mut buf).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use uavlink_core::error::{Error, Result};
use uavlink_core::transport::ByteTransport;

/// Default connection timeout (5 seconds).
///
/// Generous enough for LAN links and SITL on localhost, short enough that
/// an unreachable vehicle does not leave the UI hanging.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// TCP [`ByteTransport`].
///
/// The stream is split on open so the owning connection's read loop can
/// block on [`read_block`](ByteTransport::read_block) while sends proceed
/// through the write half.
#[derive(Debug)]
pub struct TcpTransport {
    /// The `host:port` string to connect to.
    addr: String,
    /// Connection timeout applied in `open()`.
    connect_timeout: Duration,
    /// Read half of the stream, `None` until `open()` / after `close()`.
    reader: Mutex<Option<OwnedReadHalf>>,
    /// Write half of the stream, `None` until `open()` / after `close()`.
    writer: Mutex<Option<OwnedWriteHalf>>,
}

impl TcpTransport {
    /// Create a transport targeting a `host:port` endpoint with the
    /// default connect timeout.
    pub fn new(addr: impl Into<String>) -> Self {
        Self::with_timeout(addr, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a transport with a specific connect timeout.
    pub fn with_timeout(addr: impl Into<String>, connect_timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout,
            reader: Mutex::new(None),
            writer: Mutex::new(None),
        }
    }

    /// The endpoint this transport connects to.
    pub fn addr(&self) -> &str {
        &self.addr
    }
}

#[async_trait]
impl ByteTransport for TcpTransport {
    async fn open(&self) -> Result<()> {
        tracing::debug!(
            addr = %self.addr,
            timeout_ms = self.connect_timeout.as_millis(),
            "Connecting to TCP endpoint"
        );

        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                tracing::error!(addr = %self.addr, "TCP connection timed out");
                Error::Timeout
            })?
            .map_err(|e| {
                tracing::error!(addr = %self.addr, error = %e, "TCP connection failed");
                map_connect_error(e, &self.addr)
            })?;

        // Disable Nagle's algorithm; telemetry packets are small and
        // latency-sensitive.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::warn!(
                addr = %self.addr,
                error = %e,
                "Failed to set TCP_NODELAY (continuing anyway)"
            );
        }

        tracing::info!(addr = %self.addr, "TCP connection established");

        let (read_half, write_half) = stream.into_split();
        *self.reader.lock().await = Some(read_half);
        *self.writer.lock().await = Some(write_half);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let reader = self.reader.lock().await.take();
        let writer = self.writer.lock().await.take();

        if reader.is_some() || writer.is_some() {
            tracing::debug!(addr = %self.addr, "Closing TCP connection");
        }

        if let Some(mut write_half) = writer {
            if let Err(e) = write_half.shutdown().await {
                tracing::warn!(
                    addr = %self.addr,
                    error = %e,
                    "Failed to shutdown TCP stream (continuing anyway)"
                );
            }
        }

        Ok(())
    }

    async fn read_block(&self, buf: &mut [u8]) -> Result<usize> {
        let mut guard = self.reader.lock().await;
        let reader = guard.as_mut().ok_or(Error::NotConnected)?;

        let n = reader.read(buf).await.map_err(|e| {
            tracing::error!(addr = %self.addr, error = %e, "Failed to receive data");
            map_io_error(e)
        })?;

        if n == 0 {
            // Peer closed the connection; the caller treats 0 as
            // end-of-stream.
            tracing::warn!(addr = %self.addr, "Peer closed connection (0 bytes read)");
        } else {
            tracing::trace!(addr = %self.addr, bytes = n, "Received data");
        }

        Ok(n)
    }

    async fn send_buffer(&self, data: &[u8]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(Error::NotConnected)?;

        tracing::trace!(addr = %self.addr, bytes = data.len(), "Sending data");

        writer.write_all(data).await.map_err(|e| {
            tracing::error!(addr = %self.addr, error = %e, "Failed to send data");
            map_io_error(e)
        })?;

        writer.flush().await.map_err(|e| {
            tracing::error!(addr = %self.addr, error = %e, "Failed to flush TCP stream");
            map_io_error(e)
        })?;

        Ok(())
    }
}

/// Map a connection-time I/O error to the appropriate [`Error`] variant.
fn map_connect_error(e: std::io::Error, addr: &str) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionRefused => {
            Error::Transport(format!("connection refused: {}", addr))
        }
        _ => Error::Io(e),
    }
}

/// Map a data-path I/O error to the appropriate [`Error`] variant.
fn map_io_error(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::ConnectionReset
        | std::io::ErrorKind::BrokenPipe
        | std::io::ErrorKind::NotConnected
        | std::io::ErrorKind::ConnectionAborted => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}
