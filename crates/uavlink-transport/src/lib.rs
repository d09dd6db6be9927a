//! Transport implementations for uavlink.
//!
//! This crate provides concrete implementations of the
//! [`ByteTransport`](uavlink_core::ByteTransport) trait from `uavlink-core`
//! for the physical links a ground station uses:
//!
//! - [`UdpTransport`]: server-style UDP for telemetry over WiFi or an IP
//!   radio; learns the vehicle's endpoint from the first datagram
//! - [`TcpTransport`]: TCP connections to companion computers, SITL
//!   simulators, and serial-to-IP bridges
//! - [`SerialTransport`]: USB telemetry radios and direct serial links to
//!   the autopilot
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
//! let mut buf = [0u8; 4096];
//! let n = transport.read_block(&mut buf).await?;
//! # Ok(())
//! # }
//! ```

pub mod serial;
pub mod tcp;
pub mod udp;

pub use serial::{DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits};
pub use tcp::TcpTransport;
pub use udp::UdpTransport;
