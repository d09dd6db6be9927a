//! WiFi association gate abstraction.
//!
//! The paired vehicle broadcasts its own access point; the ground station
//! must scan for it, join it, and hold the association before any telemetry
//! flows. How the host OS scans and joins is platform-specific and out of
//! scope here, so [`PairedVehicleTransport`](crate::PairedVehicleTransport)
//! consumes it through the [`WifiAssociationGate`] trait and reacts to its
//! [`WifiEvent`] stream.

use tokio::sync::broadcast;

/// One network seen in a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiNetwork {
    /// The network's advertised name.
    pub ssid: String,
    /// Received signal strength in dBm (negative; closer to 0 is stronger).
    pub signal_dbm: i32,
}

impl WifiNetwork {
    pub fn new(ssid: impl Into<String>, signal_dbm: i32) -> Self {
        Self {
            ssid: ssid.into(),
            signal_dbm,
        }
    }
}

/// Asynchronous notifications from the association gate.
#[derive(Debug, Clone)]
pub enum WifiEvent {
    /// An association attempt is in progress.
    Connecting,
    /// The host associated with a network. The ssid names which one; it is
    /// not necessarily the paired vehicle's network.
    Connected { ssid: String },
    /// The host lost or dropped its association.
    Disconnected,
    /// A scan completed with these results.
    ScanResults(Vec<WifiNetwork>),
}

/// Platform WiFi scanning and joining, reduced to the operations the paired
/// handshake needs.
///
/// Implementations wrap the host OS's WiFi manager. All methods take `&self`
/// and must be callable from any task; events are delivered through a
/// broadcast subscription so the handshake and the association monitor can
/// observe them independently.
pub trait WifiAssociationGate: Send + Sync {
    /// Begin delivering events. Idempotent.
    fn start(&self);

    /// Stop delivering events and release platform resources. Idempotent.
    fn stop(&self);

    /// Request a fresh scan. Returns `false` if the platform refused to
    /// start one; results arrive later as [`WifiEvent::ScanResults`].
    fn refresh_scan(&self) -> bool;

    /// The most recent scan results, possibly empty.
    fn scan_results(&self) -> Vec<WifiNetwork>;

    /// Attempt to join a network with the given credential. Returns whether
    /// the platform accepted the request; the eventual association (or not)
    /// is reported through events.
    fn join_network(&self, network: &WifiNetwork, credential: &str) -> bool;

    /// Subscribe to gate events.
    fn subscribe(&self) -> broadcast::Receiver<WifiEvent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wifi_network_construction() {
        let net = WifiNetwork::new("SoloLink_5F2", -48);
        assert_eq!(net.ssid, "SoloLink_5F2");
        assert_eq!(net.signal_dbm, -48);
    }

    #[test]
    fn events_are_cloneable_for_broadcast() {
        let ev = WifiEvent::ScanResults(vec![WifiNetwork::new("SoloLink_5F2", -48)]);
        let copy = ev.clone();
        match copy {
            WifiEvent::ScanResults(nets) => assert_eq!(nets.len(), 1),
            _ => panic!("clone changed the variant"),
        }
    }
}
