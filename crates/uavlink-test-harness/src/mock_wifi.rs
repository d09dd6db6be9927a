//! Mock WiFi association gate for testing paired vehicle handshakes.
//!
//! [`MockWifiGate`] implements the [`WifiAssociationGate`] trait with
//! scripted scan results and join behavior. Scans and joins resolve on a
//! short delay through the event channel, the same asynchronous shape a
//! real platform gate has.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;

use uavlink_paired::wifi::{WifiAssociationGate, WifiEvent, WifiNetwork};

/// Delay before a scripted scan or join resolves through the event channel.
const EVENT_DELAY: Duration = Duration::from_millis(10);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A scripted [`WifiAssociationGate`] for testing without a platform WiFi
/// manager.
///
/// By default every scan reports the configured results, joins are
/// accepted, and a join resolves into an association with the joined
/// network. Each of those can be overridden to script failure paths.
pub struct MockWifiGate {
    event_tx: broadcast::Sender<WifiEvent>,
    /// What `scan_results()` and resolved scans report.
    results: Mutex<Vec<WifiNetwork>>,
    /// Whether `join_network` accepts the request.
    join_accepts: AtomicBool,
    /// Whether `refresh_scan` accepts the request.
    refresh_accepts: AtomicBool,
    /// When set, a join resolves into an association with this ssid
    /// instead of the joined network's.
    connect_to: Mutex<Option<String>>,
    /// Every `(ssid, credential)` passed to `join_network`.
    join_calls: Mutex<Vec<(String, String)>>,
    refresh_count: AtomicUsize,
    started: AtomicBool,
}

impl MockWifiGate {
    pub fn new() -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            event_tx,
            results: Mutex::new(Vec::new()),
            join_accepts: AtomicBool::new(true),
            refresh_accepts: AtomicBool::new(true),
            connect_to: Mutex::new(None),
            join_calls: Mutex::new(Vec::new()),
            refresh_count: AtomicUsize::new(0),
            started: AtomicBool::new(false),
        })
    }

    /// Set what scans report.
    pub fn set_scan_results(&self, results: Vec<WifiNetwork>) {
        *self.results.lock().unwrap() = results;
    }

    /// Script whether `join_network` accepts requests.
    pub fn set_join_accepts(&self, accepts: bool) {
        self.join_accepts.store(accepts, Ordering::SeqCst);
    }

    /// Script whether `refresh_scan` accepts requests.
    pub fn set_refresh_accepts(&self, accepts: bool) {
        self.refresh_accepts.store(accepts, Ordering::SeqCst);
    }

    /// Make joins resolve into an association with a different network,
    /// as when the host falls back to a remembered one.
    pub fn set_connect_to(&self, ssid: &str) {
        *self.connect_to.lock().unwrap() = Some(ssid.to_string());
    }

    /// Every `(ssid, credential)` pair passed to `join_network` so far.
    pub fn join_calls(&self) -> Vec<(String, String)> {
        self.join_calls.lock().unwrap().clone()
    }

    /// How many scans have been requested and accepted.
    pub fn refresh_count(&self) -> usize {
        self.refresh_count.load(Ordering::SeqCst)
    }

    /// How many live receivers the event channel currently has. Useful for
    /// asserting that handshake and monitor tasks release their
    /// subscriptions when they exit.
    pub fn subscriber_count(&self) -> usize {
        self.event_tx.receiver_count()
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_stopped(&self) -> bool {
        !self.is_started()
    }

    /// Push an event to all subscribers immediately.
    pub fn emit(&self, event: WifiEvent) {
        let _ = self.event_tx.send(event);
    }

    fn emit_delayed(&self, event: WifiEvent) {
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(EVENT_DELAY).await;
            let _ = tx.send(event);
        });
    }
}

impl WifiAssociationGate for MockWifiGate {
    fn start(&self) {
        self.started.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.started.store(false, Ordering::SeqCst);
    }

    fn refresh_scan(&self) -> bool {
        if !self.refresh_accepts.load(Ordering::SeqCst) {
            return false;
        }
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        self.emit_delayed(WifiEvent::ScanResults(self.results.lock().unwrap().clone()));
        true
    }

    fn scan_results(&self) -> Vec<WifiNetwork> {
        self.results.lock().unwrap().clone()
    }

    fn join_network(&self, network: &WifiNetwork, credential: &str) -> bool {
        self.join_calls
            .lock()
            .unwrap()
            .push((network.ssid.clone(), credential.to_string()));

        if !self.join_accepts.load(Ordering::SeqCst) {
            return false;
        }

        let ssid = self
            .connect_to
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_else(|| network.ssid.clone());
        self.emit_delayed(WifiEvent::Connecting);
        self.emit_delayed(WifiEvent::Connected { ssid });
        true
    }

    fn subscribe(&self) -> broadcast::Receiver<WifiEvent> {
        self.event_tx.subscribe()
    }
}
