//! UDP transport for vehicle telemetry.
//!
//! [`UdpTransport`] implements the [`ByteTransport`] trait in server style:
//! it binds a local port, learns the remote endpoint from the first
//! datagram the vehicle sends, and directs all subsequent sends back to
//! that endpoint. This mirrors how UDP ground stations operate -- the
//! vehicle initiates traffic, the ground side answers.
//!
//! # Example
//!
//! ```no_run
//! use uavlink_transport::UdpTransport;
//! use uavlink_core::ByteTransport;
//!
//! # async fn example() -> uavlink_core::Result<()> {
//! let transport = UdpTransport::new(14550);
//! transport.open().await?;
//!
//! // The first read learns the vehicle's address...
//! let mut buf = [0u8; 4096];
//! let n = transport.read_block(&mut buf).await?;
//!
//! // ...after which sends are routed back to it.
//! transport.send_buffer(b"request data streams").await?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::net::UdpSocket;

use uavlink_core::error::{Error, Result};
use uavlink_core::transport::ByteTransport;

/// Server-style UDP [`ByteTransport`].
///
/// The socket is shared with the owning connection's read loop through an
/// `Arc`, so sends and the blocking read run concurrently; tokio's
/// `UdpSocket` permits both through `&self`.
#[derive(Debug)]
pub struct UdpTransport {
    /// Local port to bind; 0 lets the OS assign one.
    port: u16,
    /// The bound socket, `None` until `open()` / after `close()`.
    socket: Mutex<Option<Arc<UdpSocket>>>,
    /// The remote endpoint learned from the last received datagram.
    remote: Mutex<Option<SocketAddr>>,
}

impl UdpTransport {
    /// Create a transport that will bind the given local port on open.
    pub fn new(port: u16) -> Self {
        Self {
            port,
            socket: Mutex::new(None),
            remote: Mutex::new(None),
        }
    }

    /// The local address the socket is bound to, or `None` when closed.
    ///
    /// Useful when binding port 0 to discover the assigned port.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|s| s.local_addr().ok())
    }

    /// The remote endpoint learned so far, if any.
    pub fn remote_addr(&self) -> Option<SocketAddr> {
        *self.remote.lock().unwrap()
    }

    fn current_socket(&self) -> Result<Arc<UdpSocket>> {
        self.socket
            .lock()
            .unwrap()
            .as_ref()
            .map(Arc::clone)
            .ok_or(Error::NotConnected)
    }
}

#[async_trait]
impl ByteTransport for UdpTransport {
    async fn open(&self) -> Result<()> {
        let bind_addr = format!("0.0.0.0:{}", self.port);
        tracing::debug!(addr = %bind_addr, "Binding UDP socket");

        let socket = UdpSocket::bind(&bind_addr).await.map_err(|e| {
            tracing::error!(addr = %bind_addr, error = %e, "Failed to bind UDP socket");
            Error::Transport(format!("failed to bind UDP socket on {}: {}", bind_addr, e))
        })?;

        let local = socket.local_addr().map_err(Error::Io)?;
        tracing::info!(local_addr = %local, "UDP socket bound");

        *self.socket.lock().unwrap() = Some(Arc::new(socket));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if let Some(socket) = self.socket.lock().unwrap().take() {
            if let Ok(local) = socket.local_addr() {
                tracing::debug!(local_addr = %local, "Closing UDP socket");
            }
        }
        *self.remote.lock().unwrap() = None;
        Ok(())
    }

    async fn read_block(&self, buf: &mut [u8]) -> Result<usize> {
        let socket = self.current_socket()?;

        let (n, src) = socket.recv_from(buf).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to receive datagram");
            Error::Io(e)
        })?;

        tracing::trace!(remote = %src, bytes = n, "Received datagram");
        *self.remote.lock().unwrap() = Some(src);
        Ok(n)
    }

    async fn send_buffer(&self, data: &[u8]) -> Result<()> {
        let socket = self.current_socket()?;

        let remote = self
            .remote
            .lock()
            .unwrap()
            .ok_or_else(|| Error::Transport("no remote endpoint known yet".into()))?;

        tracing::trace!(remote = %remote, bytes = data.len(), "Sending datagram");

        socket.send_to(data, remote).await.map_err(|e| {
            tracing::error!(remote = %remote, error = %e, "Failed to send datagram");
            Error::Io(e)
        })?;

        Ok(())
    }
}
