//! uavlink-core: Core traits, types, and error definitions for uavlink.
//!
//! This crate defines the transport-agnostic abstractions of the vehicle
//! link layer. Protocol consumers and concrete transports both depend on
//! these types without pulling in each other.
//!
//! # Key types
//!
//! - [`ConnectionIdentity`] -- canonical, hashable identity of one link
//!   configuration
//! - [`ByteTransport`] -- byte-level communication channel
//! - [`LinkConnection`] -- the connection lifecycle state machine
//! - [`LinkEvent`] -- asynchronous lifecycle and data notifications
//! - [`MessageChannel`] -- the upward-facing data link contract
//! - [`Error`] / [`Result`] -- error handling

pub mod channel;
pub mod error;
pub mod events;
pub mod identity;
pub mod link;
pub mod transport;

// Re-export key types at crate root for ergonomic `use uavlink_core::*`.
pub use channel::{LinkMessageChannel, MessageChannel, SendCompletion};
pub use error::{Error, Result};
pub use events::LinkEvent;
pub use identity::{
    ConnectionIdentity, ParamBag, ParamValue, TransportKind, DEFAULT_TCP_PORT, DEFAULT_UDP_PORT,
    DEFAULT_USB_BAUD,
};
pub use link::{LinkConnection, LinkStatus};
pub use transport::ByteTransport;
