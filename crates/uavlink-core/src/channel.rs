//! Message channel: the protocol-facing data link contract.
//!
//! Protocol-level consumers (the message framing/parsing layer above this
//! crate) talk to a [`MessageChannel`] and never see which transport is in
//! use. The contract is send-with-acknowledgment: every `send` invokes its
//! completion callback exactly once, with success or a failure reason, and
//! never raises synchronously for transport-level errors.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::error::Result;
use crate::events::LinkEvent;
use crate::link::{LinkConnection, LinkStatus};

/// Completion callback for one [`MessageChannel::send`]. Invoked exactly
/// once, with `Ok(())` when the underlying write completed or `Err(reason)`
/// when it failed.
pub type SendCompletion = Box<dyn FnOnce(std::result::Result<(), String>) + Send + 'static>;

/// Upward-facing data link interface consumed by protocol-level code.
///
/// Lifecycle notifications mirror the underlying
/// [`LinkConnection`](crate::link::LinkConnection) 1:1 through
/// [`subscribe`](Self::subscribe): starting, connected, disconnected,
/// data-received (one call per received block), stream-error.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    /// Open the underlying link.
    async fn open(&self) -> Result<()>;

    /// Close the underlying link.
    async fn close(&self) -> Result<()>;

    /// Whether the underlying link is `Connected`.
    fn is_connected(&self) -> bool;

    /// Hand one framed message to the transport.
    ///
    /// Transport-level errors are reported through `on_complete`, never
    /// returned or panicked from this method.
    async fn send(&self, message: &[u8], on_complete: SendCompletion);

    /// Subscribe to the mirrored lifecycle/data event stream.
    fn subscribe(&self) -> broadcast::Receiver<LinkEvent>;
}

/// [`MessageChannel`] implementation adapting a [`LinkConnection`].
///
/// Message framing is out of scope here: blocks pass through opaque.
pub struct LinkMessageChannel {
    link: Arc<LinkConnection>,
}

impl LinkMessageChannel {
    /// Wrap a link connection as a message channel.
    pub fn new(link: Arc<LinkConnection>) -> Self {
        Self { link }
    }

    /// The wrapped link connection.
    pub fn link(&self) -> &Arc<LinkConnection> {
        &self.link
    }
}

#[async_trait]
impl MessageChannel for LinkMessageChannel {
    async fn open(&self) -> Result<()> {
        self.link.open().await
    }

    async fn close(&self) -> Result<()> {
        self.link.close().await
    }

    fn is_connected(&self) -> bool {
        self.link.status() == LinkStatus::Connected
    }

    async fn send(&self, message: &[u8], on_complete: SendCompletion) {
        match self.link.send(message).await {
            Ok(()) => on_complete(Ok(())),
            Err(e) => {
                tracing::debug!(error = %e, "Message send failed");
                on_complete(Err(e.to_string()));
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.link.subscribe()
    }
}
