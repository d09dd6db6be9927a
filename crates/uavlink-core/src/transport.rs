//! Byte transport trait for vehicle links.
//!
//! The [`ByteTransport`] trait abstracts over the physical link to a
//! vehicle. Implementations exist for UDP, TCP, and USB-serial in
//! `uavlink-transport`, for the association-gated paired vehicle in
//! `uavlink-paired`, and for mock transports in `uavlink-test-harness`.
//!
//! The [`LinkConnection`](crate::link::LinkConnection) state machine holds
//! a `ByteTransport` trait object rather than specializing per transport:
//! lifecycle, threading, and notification semantics live in the state
//! machine, byte-level mechanics live here.

use async_trait::async_trait;

use crate::error::Result;

/// Asynchronous byte-level transport to a vehicle.
///
/// All methods take `&self`: the read loop and a caller issuing sends run
/// concurrently on the same transport, so implementations use interior
/// mutability (typically separate read/write halves behind mutexes).
///
/// Message framing and parsing happen above this trait; a "block" is
/// whatever unit the transport naturally delivers (a datagram, a stream
/// chunk).
#[async_trait]
pub trait ByteTransport: Send + Sync {
    /// Establish the underlying channel.
    ///
    /// May block on I/O (or, for the paired vehicle, on the full network
    /// association handshake). Called at most once per connecting episode
    /// by the owning [`LinkConnection`](crate::link::LinkConnection).
    async fn open(&self) -> Result<()>;

    /// Release all transport resources.
    ///
    /// Must not fail when already closed. The owning connection cancels an
    /// in-flight [`open`](Self::open) by dropping its future and then
    /// calling this, so it must also release whatever a partially completed
    /// `open` acquired.
    async fn close(&self) -> Result<()>;

    /// Blocking read of the next available block into `buf`.
    ///
    /// Returns the number of bytes read. A return of 0 or an error signals
    /// end-of-stream; the owning connection treats either as an unsolicited
    /// disconnect, not a fatal condition.
    async fn read_block(&self, buf: &mut [u8]) -> Result<usize>;

    /// Blocking write of one block.
    ///
    /// Safe to call concurrently with an in-progress [`read_block`](Self::read_block).
    async fn send_buffer(&self, data: &[u8]) -> Result<()>;

    /// Refresh any cached configuration before opening. No-op by default.
    async fn load_preferences(&self) -> Result<()> {
        Ok(())
    }
}
