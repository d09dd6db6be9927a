//! Paired vehicle support for uavlink.
//!
//! Some vehicles pair over their own WiFi access point: the ground station
//! must scan for the vehicle's network, join it, and hold the association
//! before telemetry flows over UDP inside that network. This crate provides:
//!
//! - [`WifiAssociationGate`]: the platform WiFi scan/join abstraction
//! - [`PairedVehicleTransport`]: a `ByteTransport` whose open is the full
//!   scan/join/associate handshake plus the inner UDP open
//! - [`PairedVehicleConnection`]: the lifecycle-managed connection, with an
//!   association monitor that closes the link if the host roams away
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use uavlink_paired::{PairedConfig, PairedVehicleConnection, WifiAssociationGate};
//!
//! # async fn example(gate: Arc<dyn WifiAssociationGate>) -> uavlink_core::Result<()> {
//! let config = PairedConfig::new("SoloLink_5F2", "sololink");
//! let conn = PairedVehicleConnection::new(config, gate);
//!
//! // Blocks through scan, join, association, and the UDP open.
//! conn.open().await?;
//! # Ok(())
//! # }
//! ```

pub mod paired;
pub mod wifi;

pub use paired::{PairedConfig, PairedVehicleConnection, PairedVehicleTransport, PAIRED_UDP_PORT};
pub use wifi::{WifiAssociationGate, WifiEvent, WifiNetwork};
