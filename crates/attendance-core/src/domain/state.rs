//! Connection state reported to listeners.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle state of the endpoint's link to its peer.
///
/// ```text
/// Disconnected ──> SearchingForHosts ──> Connecting ──> ConnectedGood
///      ^                  │                   │            │    ^
///      │                  │ no peer           │ handshake  │    │ ack
///      │                  v                   v failure    v    │
///      └──────────────────┴───────────────────┴──── ConnectedProblem
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// No session and no discovery in progress.
    Disconnected,
    /// Discovery probes are being sent.
    SearchingForHosts,
    /// A peer connected back; the handshake is running.
    Connecting,
    /// Session established and the last exchange succeeded.
    ConnectedGood,
    /// Session established but a heartbeat went unanswered.
    ConnectedProblem,
}

impl ConnectionState {
    /// Returns `true` while a session is established.
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            ConnectionState::ConnectedGood | ConnectionState::ConnectedProblem
        )
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "DISCONNECTED",
            ConnectionState::SearchingForHosts => "SEARCHING_FOR_HOSTS",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::ConnectedGood => "CONNECTED_GOOD",
            ConnectionState::ConnectedProblem => "CONNECTED_PROBLEM",
        };
        f.write_str(name)
    }
}
