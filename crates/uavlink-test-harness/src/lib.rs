//! uavlink-test-harness: Mock transports and wifi gates for testing
//! uavlink connections.
//!
//! This crate provides [`MockTransport`] for driving a
//! [`LinkConnection`](uavlink_core::LinkConnection) through its state
//! machine without real hardware, and [`MockWifiGate`] for scripting the
//! paired vehicle association handshake.

pub mod mock_transport;
pub mod mock_wifi;

pub use mock_transport::MockTransport;
pub use mock_wifi::MockWifiGate;
