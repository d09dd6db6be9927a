//! Mock byte transport for deterministic testing of connection lifecycles.
//!
//! [`MockTransport`] implements the [`ByteTransport`] trait with reads fed
//! from the test through a channel. This lets you drive a
//! [`LinkConnection`](uavlink_core::LinkConnection) through its full state
//! machine -- data arrival, stream errors, end of stream -- without real
//! network hardware.
//!
//! # Example
//!
//! ```
//! use uavlink_test_harness::MockTransport;
//!
//! let mock = MockTransport::new();
//! // Queue two telemetry blocks for the read loop to pick up.
//! mock.push_read(b"heartbeat".to_vec());
//! mock.push_read(b"attitude".to_vec());
//! ```

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use uavlink_core::error::{Error, Result};
use uavlink_core::transport::ByteTransport;

/// A scripted [`ByteTransport`] for testing without hardware.
///
/// Reads block until the test pushes data, an error, or ends the stream.
/// Opens, closes, and sent buffers are recorded for assertions.
pub struct MockTransport {
    /// Feeds `read_block`; `None` after the stream has been ended.
    read_tx: Mutex<Option<mpsc::UnboundedSender<Result<Vec<u8>>>>>,
    read_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Result<Vec<u8>>>>,
    /// When set, `open()` fails with this message.
    open_failure: Mutex<Option<String>>,
    /// When set, `send_buffer()` fails.
    fail_sends: AtomicBool,
    open_count: AtomicUsize,
    close_count: AtomicUsize,
    /// Log of all buffers sent through this transport.
    sent_log: Mutex<Vec<Vec<u8>>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            read_tx: Mutex::new(Some(tx)),
            read_rx: tokio::sync::Mutex::new(rx),
            open_failure: Mutex::new(None),
            fail_sends: AtomicBool::new(false),
            open_count: AtomicUsize::new(0),
            close_count: AtomicUsize::new(0),
            sent_log: Mutex::new(Vec::new()),
        })
    }

    /// Queue one block for the next `read_block` call.
    pub fn push_read(&self, data: Vec<u8>) {
        if let Some(tx) = self.read_tx.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(data));
        }
    }

    /// Queue a transport error for the next `read_block` call.
    pub fn push_read_error(&self, reason: &str) {
        if let Some(tx) = self.read_tx.lock().unwrap().as_ref() {
            let _ = tx.send(Err(Error::Transport(reason.to_string())));
        }
    }

    /// End the stream: subsequent reads return 0 once the queue drains.
    pub fn end_stream(&self) {
        self.read_tx.lock().unwrap().take();
    }

    /// Make the next `open()` call fail with the given message.
    pub fn fail_open_with(&self, reason: &str) {
        *self.open_failure.lock().unwrap() = Some(reason.to_string());
    }

    /// Make `send_buffer()` calls fail.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }

    /// All buffers sent through this transport, one element per
    /// `send_buffer` call.
    pub fn sent_data(&self) -> Vec<Vec<u8>> {
        self.sent_log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ByteTransport for MockTransport {
    async fn open(&self) -> Result<()> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        match self.open_failure.lock().unwrap().take() {
            Some(reason) => Err(Error::Transport(reason)),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<()> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn read_block(&self, buf: &mut [u8]) -> Result<usize> {
        let mut rx = self.read_rx.lock().await;
        match rx.recv().await {
            Some(Ok(data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                Ok(n)
            }
            Some(Err(e)) => Err(e),
            // Sender dropped via end_stream: clean end of stream.
            None => Ok(0),
        }
    }

    async fn send_buffer(&self, data: &[u8]) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Transport("send failed".into()));
        }
        self.sent_log.lock().unwrap().push(data.to_vec());
        Ok(())
    }
}
