//! # uavlink -- Vehicle Link Layer for Ground Control
//!
//! `uavlink` is an asynchronous Rust library implementing the link layer of
//! a ground control application: canonical connection identities, a
//! transport-agnostic connection lifecycle with a background read loop and
//! broadcast notifications, concrete UDP/TCP/serial transports, and the
//! WiFi association handshake for paired vehicles.
//!
//! ## Quick Start
//!
//! Add `uavlink` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! uavlink = "0.1"
//! tokio = { version = "1", features = ["full"] }
//! ```
//!
//! Open a UDP telemetry link and watch it:
//!
//! ```no_run
//! use std::sync::Arc;
//! use uavlink::{LinkConnection, LinkEvent};
//! use uavlink::transport::UdpTransport;
//!
//! #[tokio::main]
//! async fn main() -> uavlink::Result<()> {
//!     let transport = Arc::new(UdpTransport::new(14550));
//!     let link = LinkConnection::new(transport);
//!
//!     let mut events = link.subscribe();
//!     link.open().await?;
//!
//!     while let Ok(event) = events.recv().await {
//!         match event {
//!             LinkEvent::DataReceived(block) => println!("{} bytes", block.len()),
//!             LinkEvent::Disconnected => break,
//!             other => println!("{:?}", other),
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! The library is organized as a workspace of focused crates:
//!
//! | Crate                   | Purpose                                       |
//! |-------------------------|-----------------------------------------------|
//! | `uavlink-core`          | [`ConnectionIdentity`], [`ByteTransport`], [`LinkConnection`], [`MessageChannel`], errors |
//! | `uavlink-transport`     | UDP, TCP, serial transport implementations    |
//! | `uavlink-paired`        | WiFi-paired vehicle handshake and connection  |
//! | `uavlink-test-harness`  | Mock transports and wifi gates for tests      |
//! | **`uavlink`**           | This facade crate -- re-exports everything    |
//!
//! All transports implement the [`ByteTransport`] trait, so the lifecycle
//! machinery in [`LinkConnection`] is identical whether bytes travel over a
//! UDP socket, a TCP stream, a USB radio, or the paired vehicle's network.
//!
//! ## Connection Identities
//!
//! Each connection configuration reduces to a canonical key, so two
//! configurations that would reach the same vehicle compare and hash as
//! equal:
//!
//! ```
//! use uavlink::{ConnectionIdentity, TransportKind, ParamBag, identity::keys};
//!
//! let identity = ConnectionIdentity::new(
//!     TransportKind::Udp,
//!     ParamBag::new().with(keys::UDP_PORT, 14550u16),
//! );
//! assert_eq!(identity.canonical_key(), "udp:14550");
//! ```

pub use uavlink_core::*;

/// Concrete byte transports.
///
/// Provides [`UdpTransport`](transport::UdpTransport),
/// [`TcpTransport`](transport::TcpTransport), and
/// [`SerialTransport`](transport::SerialTransport).
pub mod transport {
    pub use uavlink_transport::*;
}

/// WiFi-paired vehicle support.
///
/// Provides [`PairedVehicleConnection`](paired::PairedVehicleConnection) and
/// the [`WifiAssociationGate`](paired::WifiAssociationGate) platform trait.
pub mod paired {
    pub use uavlink_paired::*;
}
