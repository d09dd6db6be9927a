//! Link connection lifecycle state machine.
//!
//! [`LinkConnection`] wraps one [`ByteTransport`] and manages its lifecycle:
//! the `Disconnected -> Connecting -> Connected` transitions, the background
//! read loop, and the notification contract. Transitions are serialized by
//! compare-and-swap on an atomic status word, so callers on any task can
//! issue `open()`/`close()`/`send()` without external locking, and
//! [`status()`](LinkConnection::status) reads are lock-free.
//!
//! Failure semantics: an error during `open()` is reported once via
//! [`LinkEvent::ConnectionFailed`] and leaves the link `Disconnected` -- no
//! automatic retry at this layer. An error during established I/O degrades
//! the link to `Disconnected` via exactly one [`LinkEvent::StreamError`] /
//! [`LinkEvent::Disconnected`] pair; nothing is thrown across the
//! subscriber boundary.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::events::LinkEvent;
use crate::transport::ByteTransport;

/// Size of the read loop's block buffer. Large enough for one telemetry
/// datagram on any supported transport.
const READ_BLOCK_SIZE: usize = 4096;

/// Broadcast channel capacity for LinkEvent subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Lifecycle state of a link connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStatus {
    /// No link. The initial state, re-entered on every teardown.
    Disconnected,
    /// An `open()` attempt is in progress.
    Connecting,
    /// The link is established and the read loop is running.
    Connected,
}

impl LinkStatus {
    fn as_u8(self) -> u8 {
        match self {
            LinkStatus::Disconnected => 0,
            LinkStatus::Connecting => 1,
            LinkStatus::Connected => 2,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            1 => LinkStatus::Connecting,
            2 => LinkStatus::Connected,
            _ => LinkStatus::Disconnected,
        }
    }
}

/// Lifecycle-managed wrapper around one [`ByteTransport`].
///
/// The transport handle is exclusively owned by this connection; the read
/// loop runs on a dedicated task for the life of `Connected`, and at most
/// one read loop exists per instance -- enforced here, not by the transport.
pub struct LinkConnection {
    /// The transport this connection drives. Shared with the read task.
    transport: Arc<dyn ByteTransport>,

    /// Current [`LinkStatus`], CAS-transitioned, lock-free to read.
    status: Arc<AtomicU8>,

    /// Event broadcast channel sender.
    event_tx: broadcast::Sender<LinkEvent>,

    /// Bumped on every teardown. An in-flight `open()` watches it so a
    /// `close()` can cancel the attempt even while the open hook is
    /// blocked; the status word, not the counter value, decides whether
    /// the attempt was cancelled.
    teardown_tx: watch::Sender<u64>,

    /// Background read task handle, present only while `Connected`.
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl LinkConnection {
    /// Create a connection around a transport. The link starts
    /// `Disconnected`; nothing is opened until [`open()`](Self::open).
    pub fn new(transport: Arc<dyn ByteTransport>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (teardown_tx, _) = watch::channel(0);
        Self {
            transport,
            status: Arc::new(AtomicU8::new(LinkStatus::Disconnected.as_u8())),
            event_tx,
            teardown_tx,
            read_task: Mutex::new(None),
        }
    }

    /// Subscribe to lifecycle and data events.
    ///
    /// Multiple subscribers can be created; each gets an independent copy
    /// of every event.
    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.event_tx.subscribe()
    }

    /// The last committed lifecycle state. Lock-free.
    pub fn status(&self) -> LinkStatus {
        LinkStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// Whether the link is currently established.
    pub fn is_connected(&self) -> bool {
        self.status() == LinkStatus::Connected
    }

    /// Open the link.
    ///
    /// No-op when already `Connecting` or `Connected` (the open hook is not
    /// re-triggered). Otherwise runs the transport's `load_preferences` and
    /// `open` hooks, which may block until the link resolves. Exactly one
    /// terminal notification fires per attempt: [`LinkEvent::Connected`] or
    /// [`LinkEvent::ConnectionFailed`]. The failure is also returned to the
    /// awaiting caller.
    ///
    /// A `close()` issued while the attempt is in flight cancels it: the
    /// in-progress hook future is dropped, `ByteTransport::close` releases
    /// whatever the hook acquired, no failure notification fires for that
    /// attempt, and this method returns `Ok(())`.
    pub async fn open(&self) -> Result<()> {
        let mut teardown = self.teardown_tx.subscribe();

        if self
            .status
            .compare_exchange(
                LinkStatus::Disconnected.as_u8(),
                LinkStatus::Connecting.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            tracing::debug!(status = ?self.status(), "open ignored; link is not idle");
            return Ok(());
        }

        let _ = self.event_tx.send(LinkEvent::Connecting);
        tracing::debug!("Opening link");

        let hook = async {
            self.transport.load_preferences().await?;
            self.transport.open().await
        };

        // close() commits Disconnected and then notifies the teardown
        // channel, so waking on it and re-reading the status word catches a
        // cancellation no matter where the hook is suspended -- including a
        // close that lands before the hook runs at all. The status check,
        // not the notification itself, decides: a notification left over
        // from an earlier teardown finds the status at Connecting and is
        // ignored.
        let opened = tokio::select! {
            result = hook => Some(result),
            _ = teardown.wait_for(|_| {
                LinkStatus::from_u8(self.status.load(Ordering::SeqCst))
                    == LinkStatus::Disconnected
            }) => None,
        };

        match opened {
            None => {
                // Cancelled by close(). The closer has already emitted
                // Disconnected; release whatever the dropped hook acquired
                // and report nothing further for this attempt.
                tracing::debug!("Open attempt cancelled by close");
                let _ = self.transport.close().await;
                Ok(())
            }
            Some(Ok(())) => {
                if self
                    .status
                    .compare_exchange(
                        LinkStatus::Connecting.as_u8(),
                        LinkStatus::Connected.as_u8(),
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                    .is_err()
                {
                    // Closed while the hook was completing. The closer has
                    // already emitted Disconnected; release what the hook
                    // acquired and report nothing further for this attempt.
                    tracing::debug!("Link closed during open; discarding attempt");
                    let _ = self.transport.close().await;
                    return Ok(());
                }

                let _ = self.event_tx.send(LinkEvent::Connected);
                self.spawn_read_loop().await;
                tracing::info!("Link connected");
                Ok(())
            }
            Some(Err(e)) => {
                if self
                    .status
                    .compare_exchange(
                        LinkStatus::Connecting.as_u8(),
                        LinkStatus::Disconnected.as_u8(),
                        Ordering::SeqCst,
                        Ordering::SeqCst,
                    )
                    .is_ok()
                {
                    tracing::warn!(error = %e, "Link open failed");
                    // Release any partially acquired transport state.
                    let _ = self.transport.close().await;
                    let _ = self.event_tx.send(LinkEvent::ConnectionFailed {
                        reason: e.to_string(),
                    });
                    Err(e)
                } else {
                    // The attempt was cancelled by close(); its Disconnected
                    // notification already fired, ours must not.
                    tracing::debug!(error = %e, "Open attempt cancelled by close");
                    Ok(())
                }
            }
        }
    }

    /// Close the link.
    ///
    /// No-op when already `Disconnected`. From `Connecting` it cancels the
    /// in-flight open attempt; from `Connected` it stops the read loop and
    /// releases the transport. Exactly one [`LinkEvent::Disconnected`]
    /// fires per teardown.
    pub async fn close(&self) -> Result<()> {
        loop {
            let current = self.status.load(Ordering::SeqCst);
            if current == LinkStatus::Disconnected.as_u8() {
                return Ok(());
            }
            if self
                .status
                .compare_exchange(
                    current,
                    LinkStatus::Disconnected.as_u8(),
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                )
                .is_ok()
            {
                tracing::debug!("Closing link");
                // Wake an open() blocked in its hook; it re-reads the
                // status just committed above and abandons the attempt.
                self.teardown_tx.send_modify(|epoch| *epoch += 1);
                if let Some(task) = self.read_task.lock().await.take() {
                    task.abort();
                }
                let _ = self.transport.close().await;
                let _ = self.event_tx.send(LinkEvent::Disconnected);
                tracing::info!("Link disconnected");
                return Ok(());
            }
            // Lost the race with another transition; re-read and retry.
        }
    }

    /// Send one block over the link.
    ///
    /// Requires `Connected`; returns [`Error::NotConnected`] otherwise.
    /// Safe to call while the read loop is blocked in a read.
    pub async fn send(&self, data: &[u8]) -> Result<()> {
        if self.status() != LinkStatus::Connected {
            return Err(Error::NotConnected);
        }
        self.transport.send_buffer(data).await
    }

    /// Spawn the background read loop. Called exactly once per `Connected`
    /// lifetime, immediately after the transition.
    async fn spawn_read_loop(&self) {
        let transport = Arc::clone(&self.transport);
        let status = Arc::clone(&self.status);
        let event_tx = self.event_tx.clone();

        let handle = tokio::spawn(async move {
            let mut buf = vec![0u8; READ_BLOCK_SIZE];
            loop {
                match transport.read_block(&mut buf).await {
                    Ok(0) => {
                        // End of stream: an unsolicited disconnect.
                        if transition_to_disconnected(&status) {
                            tracing::debug!("Transport reached end of stream");
                            let _ = transport.close().await;
                            let _ = event_tx.send(LinkEvent::Disconnected);
                        }
                        break;
                    }
                    Ok(n) => {
                        let _ = event_tx.send(LinkEvent::DataReceived(buf[..n].to_vec()));
                    }
                    Err(e) => {
                        if transition_to_disconnected(&status) {
                            tracing::warn!(error = %e, "Read loop terminated by transport error");
                            let _ = transport.close().await;
                            let _ = event_tx.send(LinkEvent::StreamError {
                                reason: e.to_string(),
                            });
                            let _ = event_tx.send(LinkEvent::Disconnected);
                        }
                        break;
                    }
                }
            }
        });

        *self.read_task.lock().await = Some(handle);
    }
}

/// CAS `Connected -> Disconnected`. The winner of this transition is the
/// only party allowed to emit teardown notifications.
fn transition_to_disconnected(status: &AtomicU8) -> bool {
    status
        .compare_exchange(
            LinkStatus::Connected.as_u8(),
            LinkStatus::Disconnected.as_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        )
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Scripted transport: reads are fed through a channel by the test,
    /// opens/closes are counted, and sends are recorded.
    struct ScriptedTransport {
        fail_open_with: Option<String>,
        hang_open: bool,
        opens: AtomicUsize,
        closes: AtomicUsize,
        incoming: Mutex<mpsc::UnboundedReceiver<Result<Vec<u8>>>>,
        sent: std::sync::Mutex<Vec<Vec<u8>>>,
    }

    impl ScriptedTransport {
        fn pair() -> (Arc<Self>, mpsc::UnboundedSender<Result<Vec<u8>>>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let transport = Arc::new(ScriptedTransport {
                fail_open_with: None,
                hang_open: false,
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                incoming: Mutex::new(rx),
                sent: std::sync::Mutex::new(Vec::new()),
            });
            (transport, tx)
        }

        fn failing(reason: &str) -> Arc<Self> {
            let (_, rx) = mpsc::unbounded_channel();
            Arc::new(ScriptedTransport {
                fail_open_with: Some(reason.to_string()),
                hang_open: false,
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                incoming: Mutex::new(rx),
                sent: std::sync::Mutex::new(Vec::new()),
            })
        }

        /// A transport whose open never resolves and whose close does not
        /// unblock it.
        fn hanging() -> Arc<Self> {
            let (_, rx) = mpsc::unbounded_channel();
            Arc::new(ScriptedTransport {
                fail_open_with: None,
                hang_open: true,
                opens: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                incoming: Mutex::new(rx),
                sent: std::sync::Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ByteTransport for ScriptedTransport {
        async fn open(&self) -> Result<()> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.hang_open {
                std::future::pending::<()>().await;
            }
            match &self.fail_open_with {
                Some(reason) => Err(Error::Transport(reason.clone())),
                None => Ok(()),
            }
        }

        async fn close(&self) -> Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn read_block(&self, buf: &mut [u8]) -> Result<usize> {
            let mut incoming = self.incoming.lock().await;
            match incoming.recv().await {
                Some(Ok(data)) => {
                    let n = data.len().min(buf.len());
                    buf[..n].copy_from_slice(&data[..n]);
                    Ok(n)
                }
                Some(Err(e)) => Err(e),
                // Sender dropped: end of stream.
                None => Ok(0),
            }
        }

        async fn send_buffer(&self, data: &[u8]) -> Result<()> {
            self.sent.lock().unwrap().push(data.to_vec());
            Ok(())
        }
    }

    /// Drain every event currently queued on the receiver.
    fn drain(rx: &mut broadcast::Receiver<LinkEvent>) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            events.push(ev);
        }
        events
    }

    #[tokio::test]
    async fn open_success_emits_connecting_then_connected() {
        let (transport, _feed) = ScriptedTransport::pair();
        let link = LinkConnection::new(transport.clone());
        let mut rx = link.subscribe();

        link.open().await.unwrap();

        assert_eq!(link.status(), LinkStatus::Connected);
        assert!(link.is_connected());

        let events = drain(&mut rx);
        assert!(matches!(events[0], LinkEvent::Connecting));
        assert!(matches!(events[1], LinkEvent::Connected));
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn open_failure_emits_exactly_one_failed_notification() {
        let transport = ScriptedTransport::failing("socket bind refused");
        let link = LinkConnection::new(transport.clone());
        let mut rx = link.subscribe();

        let result = link.open().await;
        assert!(matches!(result, Err(Error::Transport(_))));
        assert_eq!(link.status(), LinkStatus::Disconnected);

        let events = drain(&mut rx);
        let failed: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, LinkEvent::ConnectionFailed { .. }))
            .collect();
        assert_eq!(failed.len(), 1);
        match failed[0] {
            LinkEvent::ConnectionFailed { reason } => {
                assert!(reason.contains("socket bind refused"), "reason: {reason}");
            }
            _ => unreachable!(),
        }
        assert!(
            !events.iter().any(|e| matches!(e, LinkEvent::Connected)),
            "a failed open must never produce a connected notification"
        );
    }

    #[tokio::test]
    async fn open_when_connected_does_not_retrigger_the_hook() {
        let (transport, _feed) = ScriptedTransport::pair();
        let link = LinkConnection::new(transport.clone());

        link.open().await.unwrap();
        link.open().await.unwrap();

        assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
        assert_eq!(link.status(), LinkStatus::Connected);
    }

    #[tokio::test]
    async fn data_received_preserves_read_order() {
        let (transport, feed) = ScriptedTransport::pair();
        let link = LinkConnection::new(transport);
        let mut rx = link.subscribe();

        link.open().await.unwrap();

        feed.send(Ok(b"first".to_vec())).unwrap();
        feed.send(Ok(b"second".to_vec())).unwrap();
        feed.send(Ok(b"third".to_vec())).unwrap();

        let mut received = Vec::new();
        while received.len() < 3 {
            match rx.recv().await.unwrap() {
                LinkEvent::DataReceived(block) => received.push(block),
                _ => {}
            }
        }
        assert_eq!(received[0], b"first");
        assert_eq!(received[1], b"second");
        assert_eq!(received[2], b"third");
    }

    #[tokio::test]
    async fn read_error_emits_one_stream_error_disconnected_pair() {
        let (transport, feed) = ScriptedTransport::pair();
        let link = LinkConnection::new(transport);
        let mut rx = link.subscribe();

        link.open().await.unwrap();
        // Skip the lifecycle events from open.
        drain(&mut rx);

        feed.send(Err(Error::Transport("radio out of range".into())))
            .unwrap();

        // Wait for the read loop to observe the error and tear down.
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(link.status(), LinkStatus::Disconnected);
        assert!(!link.is_connected());

        let events = drain(&mut rx);
        let stream_errors = events
            .iter()
            .filter(|e| matches!(e, LinkEvent::StreamError { .. }))
            .count();
        let disconnects = events
            .iter()
            .filter(|e| matches!(e, LinkEvent::Disconnected))
            .count();
        assert_eq!(stream_errors, 1);
        assert_eq!(disconnects, 1);

        // A later close() is a no-op and fires nothing further.
        link.close().await.unwrap();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn zero_length_read_is_an_unsolicited_disconnect() {
        let (transport, feed) = ScriptedTransport::pair();
        let link = LinkConnection::new(transport);
        let mut rx = link.subscribe();

        link.open().await.unwrap();
        drain(&mut rx);

        // Dropping the feed makes read_block return Ok(0).
        drop(feed);
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(link.status(), LinkStatus::Disconnected);
        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(e, LinkEvent::Disconnected)));
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, LinkEvent::StreamError { .. })),
            "a clean end of stream is not a stream error"
        );
    }

    #[tokio::test]
    async fn close_when_disconnected_is_a_noop() {
        let (transport, _feed) = ScriptedTransport::pair();
        let link = LinkConnection::new(transport.clone());
        let mut rx = link.subscribe();

        link.close().await.unwrap();

        assert!(drain(&mut rx).is_empty());
        assert_eq!(transport.closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn close_emits_exactly_one_disconnected() {
        let (transport, _feed) = ScriptedTransport::pair();
        let link = LinkConnection::new(transport.clone());
        let mut rx = link.subscribe();

        link.open().await.unwrap();
        drain(&mut rx);

        link.close().await.unwrap();
        link.close().await.unwrap();

        let events = drain(&mut rx);
        let disconnects = events
            .iter()
            .filter(|e| matches!(e, LinkEvent::Disconnected))
            .count();
        assert_eq!(disconnects, 1);
        assert_eq!(link.status(), LinkStatus::Disconnected);
    }

    #[tokio::test]
    async fn close_cancels_open_blocked_in_the_hook() {
        let transport = ScriptedTransport::hanging();
        let link = Arc::new(LinkConnection::new(transport.clone()));
        let mut rx = link.subscribe();

        let opener = tokio::spawn({
            let link = Arc::clone(&link);
            async move { link.open().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(link.status(), LinkStatus::Connecting);

        link.close().await.unwrap();

        opener.await.unwrap().unwrap();
        assert_eq!(link.status(), LinkStatus::Disconnected);
        assert!(transport.closes.load(Ordering::SeqCst) >= 1);
        let events = drain(&mut rx);
        assert!(
            !events
                .iter()
                .any(|e| matches!(e, LinkEvent::ConnectionFailed { .. })),
            "cancelled attempt must not report a failure: {events:?}"
        );
        assert!(events.iter().any(|e| matches!(e, LinkEvent::Disconnected)));
    }

    #[tokio::test]
    async fn send_requires_connected() {
        let (transport, _feed) = ScriptedTransport::pair();
        let link = LinkConnection::new(transport.clone());

        let result = link.send(b"heartbeat").await;
        assert!(matches!(result, Err(Error::NotConnected)));

        link.open().await.unwrap();
        link.send(b"heartbeat").await.unwrap();

        assert_eq!(transport.sent.lock().unwrap().as_slice(), &[b"heartbeat".to_vec()]);
    }
}
