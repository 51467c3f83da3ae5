//! Error taxonomy for connection, session, and submission failures.
//!
//! Every connection or session error drives the state machine to
//! `Disconnected` before it is returned; the supervisor in
//! [`crate::Endpoint::run_forever`] then starts a fresh discovery.

use attendance_core::ProtocolError;
use thiserror::Error;

/// Errors produced by endpoint operations.
#[derive(Debug, Error)]
pub enum EndpointError {
    /// No peer connected back within the discovery try budget.
    #[error("No host found ({attempts} attempts)")]
    Discovery { attempts: u32 },

    /// The handshake reply was missing, malformed, or mistargeted.
    #[error("handshake failure: {0}")]
    Handshake(String),

    /// A frame received during the session violated the protocol.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The peer closed the session connection.
    #[error("connection closed by peer")]
    TransportClosed,

    /// A code or heartbeat went unacknowledged for every allowed attempt.
    #[error("{operation} unacknowledged after {attempts} attempts")]
    RetryBudgetExceeded {
        operation: &'static str,
        attempts: u32,
    },

    /// The heartbeat counter correction exchange failed.
    #[error("heartbeat counter correction failed: {0}")]
    CounterCorrection(String),

    /// A socket operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An entry of the known-host list is not a usable address.
    #[error("invalid host address: {0}")]
    InvalidHost(String),

    /// Another caller is already awaiting an expiry.
    #[error("another code is already awaiting its expiry")]
    AwaitInProgress,

    /// The session side of the code queue has been dropped.
    #[error("code queue closed")]
    QueueClosed,
}
