//! Error types for uavlink.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Transport-layer and configuration
//! errors are all captured here. Expected runtime failures (a vehicle going
//! out of range, a rejected network join) are additionally surfaced through
//! [`LinkEvent`](crate::events::LinkEvent) notifications -- see the
//! propagation notes on [`LinkConnection`](crate::link::LinkConnection).

/// The error type for all uavlink operations.
///
/// Variants cover the failure modes encountered when talking to a vehicle
/// over heterogeneous links: transport failures, lost connections, timeouts,
/// and bad connection parameters.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A transport-level error (UDP socket, TCP socket, serial port,
    /// network association).
    #[error("transport error: {0}")]
    Transport(String),

    /// An invalid or missing connection parameter (e.g. an empty paired
    /// vehicle link id).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Timed out waiting for the link to respond.
    #[error("timeout waiting for link")]
    Timeout,

    /// No connection to the vehicle has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the vehicle was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_transport() {
        let e = Error::Transport("port busy".into());
        assert_eq!(e.to_string(), "transport error: port busy");
    }

    #[test]
    fn error_display_invalid_parameter() {
        let e = Error::InvalidParameter("missing link id".into());
        assert_eq!(e.to_string(), "invalid parameter: missing link id");
    }

    #[test]
    fn error_display_not_connected() {
        let e = Error::NotConnected;
        assert_eq!(e.to_string(), "not connected");
    }

    #[test]
    fn error_display_connection_lost() {
        let e = Error::ConnectionLost;
        assert_eq!(e.to_string(), "connection lost");
    }

    #[test]
    fn error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let e: Error = io_err.into();
        assert!(matches!(e, Error::Io(_)));
        assert!(e.to_string().contains("pipe broken"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
