//! Asynchronous link lifecycle events.
//!
//! Events are emitted by a [`LinkConnection`](crate::link::LinkConnection)
//! through a [`tokio::sync::broadcast`] channel when the link's state
//! changes or data arrives. Protocol consumers subscribe for lifecycle and
//! data notifications without polling.

/// An event emitted by a link connection.
///
/// Subscribe via [`LinkConnection::subscribe()`](crate::link::LinkConnection::subscribe).
/// Events are delivered on a best-effort basis through a bounded broadcast
/// channel; slow consumers may miss data events under heavy telemetry load.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    /// An `open()` attempt has started.
    Connecting,

    /// The link is established; the background read loop is running.
    Connected,

    /// An `open()` attempt failed. Emitted at most once per attempt.
    ConnectionFailed {
        /// Human-readable failure reason.
        reason: String,
    },

    /// The link was torn down, either by `close()` or by a mid-stream
    /// read failure. Emitted exactly once per teardown.
    Disconnected,

    /// One block of bytes was read from the transport. Blocks are
    /// delivered in the order they were read.
    DataReceived(Vec<u8>),

    /// A mid-stream I/O error occurred. Paired with the `Disconnected`
    /// event that follows it; never escalated as a fatal condition.
    StreamError {
        /// Human-readable error description.
        reason: String,
    },
}
