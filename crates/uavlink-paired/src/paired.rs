//! Connection to a WiFi-paired vehicle.
//!
//! Vehicles like the 3DR Solo broadcast their own access point. Connecting
//! means a network handshake before any byte I/O: scan for the vehicle's
//! ssid, join the network with the pairing credential, wait for the host to
//! associate, and only then open a plain UDP telemetry link inside that
//! network.
//!
//! [`PairedVehicleTransport`] runs that handshake as its `open()` hook, so
//! the whole sequence lives inside the owning state machine's
//! `Connecting -> Connected` window. [`PairedVehicleConnection`] bundles the
//! transport with a [`LinkConnection`](uavlink_core::LinkConnection) and a
//! monitor task that tears the link down if the host roams off the
//! vehicle's network.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use uavlink_core::error::{Error, Result};
use uavlink_core::events::LinkEvent;
use uavlink_core::link::{LinkConnection, LinkStatus};
use uavlink_core::transport::ByteTransport;
use uavlink_transport::UdpTransport;

use crate::wifi::{WifiAssociationGate, WifiEvent, WifiNetwork};

/// UDP port the paired vehicle streams telemetry on once associated.
pub const PAIRED_UDP_PORT: u16 = 14550;

/// Configuration for a paired vehicle connection.
#[derive(Debug, Clone)]
pub struct PairedConfig {
    /// The vehicle network's ssid. Matching is case-insensitive.
    pub target_ssid: String,
    /// Pairing credential passed to the association gate's join.
    pub credential: String,
    /// Local UDP port for the inner telemetry transport.
    pub udp_port: u16,
    /// Maximum number of scan refreshes before the handshake gives up.
    /// `None` retries until `close()`.
    pub scan_retry_limit: Option<u32>,
}

impl PairedConfig {
    pub fn new(target_ssid: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            target_ssid: target_ssid.into(),
            credential: credential.into(),
            udp_port: PAIRED_UDP_PORT,
            scan_retry_limit: None,
        }
    }
}

/// Outcome of evaluating one batch of scan results.
enum ScanOutcome {
    /// The target was found and a join was requested; await association.
    JoinRequested,
    /// Not found; a fresh scan was requested, await the next results.
    Retrying,
}

/// [`ByteTransport`] whose `open()` is the full scan/join/associate
/// handshake followed by opening an inner UDP transport. Byte I/O is pure
/// pass-through to the inner transport. A handshake blocked in `open()` is
/// cancelled by the owning [`LinkConnection`] dropping the attempt and
/// calling `close()`.
pub struct PairedVehicleTransport {
    config: PairedConfig,
    gate: Arc<dyn WifiAssociationGate>,
    inner: UdpTransport,
}

impl PairedVehicleTransport {
    pub fn new(config: PairedConfig, gate: Arc<dyn WifiAssociationGate>) -> Self {
        let inner = UdpTransport::new(config.udp_port);
        Self {
            config,
            gate,
            inner,
        }
    }

    fn target_matches(&self, ssid: &str) -> bool {
        ssid.eq_ignore_ascii_case(&self.config.target_ssid)
    }

    /// Look for the target in one batch of scan results. Found -> request a
    /// join; a rejected join is terminal. Not found -> count the attempt and
    /// request a fresh scan.
    fn evaluate_scan(&self, results: &[WifiNetwork], attempts: &mut u32) -> Result<ScanOutcome> {
        if let Some(network) = results.iter().find(|n| self.target_matches(&n.ssid)) {
            tracing::debug!(ssid = %network.ssid, signal_dbm = network.signal_dbm, "Target network found, joining");
            if self.gate.join_network(network, &self.config.credential) {
                return Ok(ScanOutcome::JoinRequested);
            }
            tracing::warn!(ssid = %network.ssid, "Network join rejected");
            return Err(Error::Transport(format!(
                "unable to join network {}",
                network.ssid
            )));
        }

        *attempts += 1;
        if let Some(limit) = self.config.scan_retry_limit {
            if *attempts > limit {
                tracing::warn!(
                    ssid = %self.config.target_ssid,
                    attempts = *attempts,
                    "Scan retry limit reached"
                );
                return Err(Error::Transport(format!(
                    "network {} not found after {} scans",
                    self.config.target_ssid, *attempts
                )));
            }
        }

        tracing::debug!(
            ssid = %self.config.target_ssid,
            attempt = *attempts,
            "Target network not in scan results, rescanning"
        );
        if !self.gate.refresh_scan() {
            return Err(Error::Transport("unable to start wifi scan".into()));
        }
        Ok(ScanOutcome::Retrying)
    }

    /// Run the handshake until the host associates with the target network.
    async fn await_association(&self, events: &mut broadcast::Receiver<WifiEvent>) -> Result<()> {
        let mut attempts = 0u32;

        // Results from a scan that completed before we subscribed still
        // count; evaluate them before waiting for fresh events.
        self.evaluate_scan(&self.gate.scan_results(), &mut attempts)?;

        loop {
            match events.recv().await {
                Ok(WifiEvent::Connected { ssid }) if self.target_matches(&ssid) => {
                    tracing::info!(ssid = %ssid, "Associated with vehicle network");
                    return Ok(());
                }
                Ok(WifiEvent::Connected { ssid }) => {
                    // Some other network; not ours to act on.
                    tracing::debug!(ssid = %ssid, "Ignoring association with unrelated network");
                }
                Ok(WifiEvent::ScanResults(results)) => {
                    self.evaluate_scan(&results, &mut attempts)?;
                }
                Ok(WifiEvent::Connecting) | Ok(WifiEvent::Disconnected) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Wifi event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(Error::Transport("wifi association gate stopped".into()));
                }
            }
        }
    }
}

#[async_trait]
impl ByteTransport for PairedVehicleTransport {
    async fn open(&self) -> Result<()> {
        if self.config.target_ssid.is_empty() {
            return Err(Error::InvalidParameter(
                "paired vehicle requires a target ssid".into(),
            ));
        }

        // Subscribe before starting the gate so no event can slip between.
        let mut events = self.gate.subscribe();
        self.gate.start();

        tracing::debug!(ssid = %self.config.target_ssid, "Starting paired vehicle handshake");
        self.await_association(&mut events).await?;

        self.inner.open().await
    }

    async fn close(&self) -> Result<()> {
        self.gate.stop();
        self.inner.close().await
    }

    async fn read_block(&self, buf: &mut [u8]) -> Result<usize> {
        self.inner.read_block(buf).await
    }

    async fn send_buffer(&self, data: &[u8]) -> Result<()> {
        self.inner.send_buffer(data).await
    }
}

/// Lifecycle-managed connection to a paired vehicle.
///
/// Wraps a [`LinkConnection`] over a [`PairedVehicleTransport`] and, while
/// connected, watches the association gate: roaming off the vehicle's
/// network closes the link.
pub struct PairedVehicleConnection {
    link: Arc<LinkConnection>,
    gate: Arc<dyn WifiAssociationGate>,
    target_ssid: String,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl PairedVehicleConnection {
    pub fn new(config: PairedConfig, gate: Arc<dyn WifiAssociationGate>) -> Self {
        let target_ssid = config.target_ssid.clone();
        let transport = Arc::new(PairedVehicleTransport::new(config, Arc::clone(&gate)));
        Self {
            link: Arc::new(LinkConnection::new(transport)),
            gate,
            target_ssid,
            monitor: Mutex::new(None),
        }
    }

    /// Subscribe to lifecycle and data events.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.link.subscribe()
    }

    pub fn status(&self) -> LinkStatus {
        self.link.status()
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Open the connection: run the association handshake and bring up the
    /// telemetry link. Blocks until the link resolves or `close()` cancels
    /// the attempt.
    pub async fn open(&self) -> Result<()> {
        self.link.open().await?;

        if self.link.is_connected() {
            self.spawn_association_monitor().await;
        }
        Ok(())
    }

    /// Close the connection, cancelling an in-progress handshake if one is
    /// blocked in `open()`.
    pub async fn close(&self) -> Result<()> {
        if let Some(task) = self.monitor.lock().await.take() {
            task.abort();
        }
        self.link.close().await
    }

    /// Send one block to the vehicle. Requires the link to be connected.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        self.link.send(data).await
    }

    /// Watch gate events while connected; an association change away from
    /// the vehicle's network tears the link down. The task exits as soon
    /// as the link disconnects for any reason, not only teardowns it
    /// triggered itself.
    async fn spawn_association_monitor(&self) {
        let mut gate_events = self.gate.subscribe();
        let mut link_events = self.link.subscribe();
        let link = Arc::clone(&self.link);
        let target_ssid = self.target_ssid.clone();

        let handle = tokio::spawn(async move {
            loop {
                let lost = tokio::select! {
                    event = link_events.recv() => match event {
                        Ok(LinkEvent::Disconnected) => return,
                        Err(broadcast::error::RecvError::Closed) => return,
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                            // A lagged subscriber may have missed the
                            // Disconnected notification itself.
                            if !link.is_connected() {
                                return;
                            }
                            false
                        }
                    },
                    event = gate_events.recv() => match event {
                        Ok(WifiEvent::Disconnected) => true,
                        Ok(WifiEvent::Connected { ssid }) => {
                            !ssid.eq_ignore_ascii_case(&target_ssid)
                        }
                        Ok(_) => false,
                        Err(broadcast::error::RecvError::Lagged(_)) => false,
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                };

                if lost {
                    if link.is_connected() {
                        tracing::warn!(ssid = %target_ssid, "Lost association with vehicle network, closing link");
                        let _ = link.close().await;
                    }
                    return;
                }
            }
        });

        let mut guard = self.monitor.lock().await;
        if let Some(old) = guard.take() {
            old.abort();
        }
        *guard = Some(handle);
    }
}
