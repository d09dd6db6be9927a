//! Connection identity: the canonical description of one vehicle link.
//!
//! A [`ConnectionIdentity`] pairs a [`TransportKind`] with an opaque
//! [`ParamBag`] of transport-specific parameters (port numbers, host
//! strings, device addresses, the paired vehicle link id). Identities are
//! immutable once constructed and travel across process boundaries
//! unchanged, so they derive `serde` traits.
//!
//! Equality, hashing, and deduplication are all defined over the
//! [`canonical key`](ConnectionIdentity::canonical_key), a deterministic
//! string like `"udp:14550"` or `"paired:SoloLink_5F2"`. The key is an
//! identity, not a structural diff: two identities that differ only in
//! parameters irrelevant to their transport kind compare equal.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Well-known parameter keys and their documented defaults.
///
/// The core never validates the bag beyond looking up the keys it needs;
/// unknown keys pass through verbatim.
pub mod keys {
    /// Local UDP server port (integer). Default [`DEFAULT_UDP_PORT`](super::DEFAULT_UDP_PORT).
    pub const UDP_PORT: &str = "udp_port";
    /// TCP server host (string). No default.
    pub const TCP_HOST: &str = "tcp_host";
    /// TCP server port (integer). Default [`DEFAULT_TCP_PORT`](super::DEFAULT_TCP_PORT).
    pub const TCP_PORT: &str = "tcp_port";
    /// Bluetooth device address (string). Empty when pairing by discovery.
    pub const BT_ADDRESS: &str = "bt_address";
    /// USB serial baud rate (integer). Default [`DEFAULT_USB_BAUD`](super::DEFAULT_USB_BAUD).
    pub const USB_BAUD: &str = "usb_baud";
    /// Paired vehicle network name (string).
    pub const LINK_ID: &str = "link_id";
    /// Paired vehicle network credential (string).
    pub const LINK_PASSWORD: &str = "link_password";
}

/// Default UDP server port for vehicle telemetry.
pub const DEFAULT_UDP_PORT: u16 = 14550;

/// Default TCP server port.
pub const DEFAULT_TCP_PORT: u16 = 5763;

/// Default USB serial baud rate.
pub const DEFAULT_USB_BAUD: u32 = 57600;

/// The kind of transport a connection uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Plain UDP datagram link.
    Udp,
    /// TCP stream link.
    Tcp,
    /// Bluetooth RFCOMM link.
    Bluetooth,
    /// USB virtual serial port link.
    Usb,
    /// Vehicle reachable only after joining its dedicated WiFi network.
    PairedVehicle,
}

/// A primitive parameter value: string, integer, or boolean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value (ports, baud rates).
    Int(i64),
    /// String value (hosts, addresses, identifiers).
    Str(String),
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Int(v)
    }
}

impl From<u16> for ParamValue {
    fn from(v: u16) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<u32> for ParamValue {
    fn from(v: u32) -> Self {
        ParamValue::Int(v as i64)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

/// An opaque bag of connection parameters.
///
/// Keys are free-form strings; the well-known ones live in [`keys`]. Typed
/// accessors return a caller-supplied default when the key is absent or has
/// the wrong type, mirroring how the bag is consumed: look up what you need,
/// fall back to the documented default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamBag(HashMap<String, ParamValue>);

impl ParamBag {
    /// Create an empty parameter bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Insert a parameter.
    pub fn insert(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Look up a raw parameter value.
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Look up a string parameter, falling back to `default` when absent
    /// or not a string.
    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.0.get(key) {
            Some(ParamValue::Str(s)) => s,
            _ => default,
        }
    }

    /// Look up an integer parameter, falling back to `default` when absent
    /// or not an integer.
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(ParamValue::Int(v)) => *v,
            _ => default,
        }
    }

    /// Whether the bag has no parameters.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of parameters in the bag.
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Immutable description of one connection configuration.
///
/// Constructed once by the caller requesting a connection and never mutated.
/// Two identities are equal iff their [canonical keys](Self::canonical_key)
/// are equal; hashing is over the same key, so an identity can be used
/// directly to deduplicate links in a `HashMap`/`HashSet`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionIdentity {
    kind: TransportKind,
    params: ParamBag,
}

impl ConnectionIdentity {
    /// Create an identity from a transport kind and parameter bag.
    pub fn new(kind: TransportKind, params: ParamBag) -> Self {
        Self { kind, params }
    }

    /// The transport kind of this connection.
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// The opaque parameter bag, passed through verbatim.
    pub fn params(&self) -> &ParamBag {
        &self.params
    }

    /// Compute the canonical key for this identity.
    ///
    /// A pure function of the transport kind and the subset of parameters
    /// relevant to that kind; total (never panics) and stable across process
    /// restarts given identical inputs:
    ///
    /// - `Udp` -> `"udp:<port>"` (default port 14550)
    /// - `Tcp` -> `"tcp:<host>:<port>"` (default port 5763)
    /// - `Bluetooth` -> `"bluetooth"` or `"bluetooth:<addr>"`
    /// - `Usb` -> `"usb"`
    /// - `PairedVehicle` -> `"paired:<id>"`
    pub fn canonical_key(&self) -> String {
        match self.kind {
            TransportKind::Udp => format!(
                "udp:{}",
                self.params.int_or(keys::UDP_PORT, DEFAULT_UDP_PORT as i64)
            ),
            TransportKind::Tcp => format!(
                "tcp:{}:{}",
                self.params.str_or(keys::TCP_HOST, ""),
                self.params.int_or(keys::TCP_PORT, DEFAULT_TCP_PORT as i64)
            ),
            TransportKind::Bluetooth => {
                let addr = self.params.str_or(keys::BT_ADDRESS, "");
                if addr.is_empty() {
                    "bluetooth".to_string()
                } else {
                    format!("bluetooth:{addr}")
                }
            }
            TransportKind::Usb => "usb".to_string(),
            TransportKind::PairedVehicle => {
                format!("paired:{}", self.params.str_or(keys::LINK_ID, ""))
            }
        }
    }
}

impl PartialEq for ConnectionIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.canonical_key() == other.canonical_key()
    }
}

impl Eq for ConnectionIdentity {}

impl Hash for ConnectionIdentity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical_key().hash(state);
    }
}

impl fmt::Display for ConnectionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(identity: &ConnectionIdentity) -> u64 {
        let mut hasher = DefaultHasher::new();
        identity.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn udp_key_with_explicit_port() {
        let id = ConnectionIdentity::new(
            TransportKind::Udp,
            ParamBag::new().with(keys::UDP_PORT, 14550u16),
        );
        assert_eq!(id.canonical_key(), "udp:14550");
    }

    #[test]
    fn udp_key_default_port() {
        let id = ConnectionIdentity::new(TransportKind::Udp, ParamBag::new());
        assert_eq!(id.canonical_key(), "udp:14550");
    }

    #[test]
    fn tcp_key() {
        let id = ConnectionIdentity::new(
            TransportKind::Tcp,
            ParamBag::new()
                .with(keys::TCP_HOST, "10.1.1.10")
                .with(keys::TCP_PORT, 5763u16),
        );
        assert_eq!(id.canonical_key(), "tcp:10.1.1.10:5763");
    }

    #[test]
    fn bluetooth_key_empty_address() {
        let id = ConnectionIdentity::new(
            TransportKind::Bluetooth,
            ParamBag::new().with(keys::BT_ADDRESS, ""),
        );
        assert_eq!(id.canonical_key(), "bluetooth");

        // Absent address behaves the same as an empty one.
        let id = ConnectionIdentity::new(TransportKind::Bluetooth, ParamBag::new());
        assert_eq!(id.canonical_key(), "bluetooth");
    }

    #[test]
    fn bluetooth_key_with_address() {
        let id = ConnectionIdentity::new(
            TransportKind::Bluetooth,
            ParamBag::new().with(keys::BT_ADDRESS, "AA:BB"),
        );
        assert_eq!(id.canonical_key(), "bluetooth:AA:BB");
    }

    #[test]
    fn usb_key() {
        let id = ConnectionIdentity::new(
            TransportKind::Usb,
            ParamBag::new().with(keys::USB_BAUD, 57600u32),
        );
        assert_eq!(id.canonical_key(), "usb");
    }

    #[test]
    fn paired_key() {
        let id = ConnectionIdentity::new(
            TransportKind::PairedVehicle,
            ParamBag::new().with(keys::LINK_ID, "SoloLink_5F2"),
        );
        assert_eq!(id.canonical_key(), "paired:SoloLink_5F2");
    }

    #[test]
    fn key_is_total_for_all_kinds() {
        for kind in [
            TransportKind::Udp,
            TransportKind::Tcp,
            TransportKind::Bluetooth,
            TransportKind::Usb,
            TransportKind::PairedVehicle,
        ] {
            let key = ConnectionIdentity::new(kind, ParamBag::new()).canonical_key();
            assert!(!key.is_empty(), "key for {kind:?} should not be empty");
        }
    }

    #[test]
    fn equality_ignores_unrelated_parameters() {
        let a = ConnectionIdentity::new(
            TransportKind::Udp,
            ParamBag::new().with(keys::UDP_PORT, 14550u16),
        );
        let b = ConnectionIdentity::new(
            TransportKind::Udp,
            ParamBag::new()
                .with(keys::UDP_PORT, 14550u16)
                .with("ping_interval_ms", 500i64)
                .with("verbose", true),
        );
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn different_ports_are_different_identities() {
        let a = ConnectionIdentity::new(
            TransportKind::Udp,
            ParamBag::new().with(keys::UDP_PORT, 14550u16),
        );
        let b = ConnectionIdentity::new(
            TransportKind::Udp,
            ParamBag::new().with(keys::UDP_PORT, 14551u16),
        );
        assert_ne!(a, b);
    }

    #[test]
    fn identity_deduplicates_in_hash_set() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(ConnectionIdentity::new(
            TransportKind::PairedVehicle,
            ParamBag::new().with(keys::LINK_ID, "SoloLink_5F2"),
        ));
        set.insert(ConnectionIdentity::new(
            TransportKind::PairedVehicle,
            ParamBag::new()
                .with(keys::LINK_ID, "SoloLink_5F2")
                .with(keys::LINK_PASSWORD, "sololink"),
        ));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn serde_round_trip_preserves_canonical_key() {
        let id = ConnectionIdentity::new(
            TransportKind::Tcp,
            ParamBag::new()
                .with(keys::TCP_HOST, "vehicle.local")
                .with(keys::TCP_PORT, 5763u16)
                .with("label", "bench rig"),
        );

        let encoded = serde_json::to_string(&id).unwrap();
        let decoded: ConnectionIdentity = serde_json::from_str(&encoded).unwrap();

        assert_eq!(decoded.kind(), TransportKind::Tcp);
        assert_eq!(decoded.canonical_key(), id.canonical_key());
        assert_eq!(decoded, id);
        // The bag itself passes through verbatim, including unrelated keys.
        assert_eq!(decoded.params().str_or("label", ""), "bench rig");
    }

    #[test]
    fn param_bag_typed_accessors() {
        let bag = ParamBag::new()
            .with("port", 14550u16)
            .with("host", "127.0.0.1");

        assert_eq!(bag.int_or("port", 0), 14550);
        assert_eq!(bag.str_or("host", ""), "127.0.0.1");
        // Wrong type falls back to the default.
        assert_eq!(bag.int_or("host", 42), 42);
        assert_eq!(bag.str_or("port", "none"), "none");
        // Missing key falls back to the default.
        assert_eq!(bag.int_or("missing", 7), 7);
        assert_eq!(bag.len(), 2);
    }
}
