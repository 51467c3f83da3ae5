//! All attendance protocol message types.
//!
//! Every message is a flat JSON object.  The `type` field selects the
//! variant; acknowledgements additionally carry a `targeting` field naming the
//! request kind they answer:
//!
//! ```json
//! {"type":"code","code":4242,"generation_time":1700000000}
//! {"type":"acknowledge","targeting":"code","valid_to":1700000060}
//! ```
//!
//! Serde's `#[serde(tag = "...")]` attribute maps both discriminants onto the
//! same flat object, so no hand-written field juggling is needed.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Current protocol version, advertised in every discovery probe.
pub const PROTOCOL_VERSION: u64 = 0x1;

/// Application name carried in the `app` field of discovery probes.
///
/// Peers ignore probes from other applications sharing the port.
pub const APP_NAME: &str = "attendance";

// ── Request kinds ─────────────────────────────────────────────────────────────

/// The request kinds an `acknowledge` message can target.
///
/// Serialized in `snake_case`, which is also the value of the request's own
/// `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Connect,
    Code,
    Heartbeat,
    HeartbeatError,
}

impl RequestKind {
    /// Returns the wire name of this request kind.
    pub fn as_str(self) -> &'static str {
        match self {
            RequestKind::Connect => "connect",
            RequestKind::Code => "code",
            RequestKind::Heartbeat => "heartbeat",
            RequestKind::HeartbeatError => "heartbeat_error",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Per-message payload structs ───────────────────────────────────────────────

/// UDP probe broadcast (or unicast) by the endpoint while searching for a peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryMessage {
    /// Always [`APP_NAME`].
    pub app: String,
    /// Protocol version of the sender.
    pub version: u64,
    /// Address the peer should open its TCP connection to.
    pub host: String,
}

impl DiscoveryMessage {
    /// Builds a probe for the current protocol version advertising `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            app: APP_NAME.to_string(),
            version: PROTOCOL_VERSION,
            host: host.into(),
        }
    }
}

/// A verification code submitted for registration with the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMessage {
    /// The code value shown to users.
    pub code: u64,
    /// Generation instant, in whole seconds since the Unix epoch.
    pub generation_time: u64,
}

/// Payload of an `acknowledge` message, discriminated by `targeting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "targeting", rename_all = "snake_case")]
pub enum Acknowledgement {
    /// Handshake accepted.
    Connect,
    /// Code registered; valid until `valid_to` (epoch seconds).
    Code { valid_to: u64 },
    /// Heartbeat received; `counter` is the peer's view of the counter.
    Heartbeat { counter: u64 },
    /// Counter correction accepted.
    HeartbeatError,
}

impl Acknowledgement {
    /// Returns the request kind this acknowledgement targets.
    pub fn targeting(&self) -> RequestKind {
        match self {
            Acknowledgement::Connect => RequestKind::Connect,
            Acknowledgement::Code { .. } => RequestKind::Code,
            Acknowledgement::Heartbeat { .. } => RequestKind::Heartbeat,
            Acknowledgement::HeartbeatError => RequestKind::HeartbeatError,
        }
    }
}

// ── Top-level message enum ────────────────────────────────────────────────────

/// Every message that can travel between endpoint and peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Discovery probe (UDP).
    Discovery(DiscoveryMessage),
    /// Handshake request; carries no payload.
    Connect,
    /// Reply to any request.
    Acknowledge(Acknowledgement),
    /// Code submission.
    Code(CodeMessage),
    /// Liveness heartbeat with the sender's counter.
    Heartbeat { counter: u64 },
    /// Counter correction: the sender's counter is authoritative.
    HeartbeatError { counter: u64 },
}

impl Message {
    /// Returns the wire value of this message's `type` field.
    pub fn type_name(&self) -> &'static str {
        match self {
            Message::Discovery(_) => "discovery",
            Message::Connect => "connect",
            Message::Acknowledge(_) => "acknowledge",
            Message::Code(_) => "code",
            Message::Heartbeat { .. } => "heartbeat",
            Message::HeartbeatError { .. } => "heartbeat_error",
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_kind_as_str_matches_serde_name() {
        for kind in [
            RequestKind::Connect,
            RequestKind::Code,
            RequestKind::Heartbeat,
            RequestKind::HeartbeatError,
        ] {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_discovery_message_new_uses_app_name_and_version() {
        // Arrange / Act
        let msg = DiscoveryMessage::new("10.0.0.7");

        // Assert
        assert_eq!(msg.app, "attendance");
        assert_eq!(msg.version, PROTOCOL_VERSION);
        assert_eq!(msg.host, "10.0.0.7");
    }

    #[test]
    fn test_acknowledgement_targeting_for_each_variant() {
        assert_eq!(Acknowledgement::Connect.targeting(), RequestKind::Connect);
        assert_eq!(
            Acknowledgement::Code { valid_to: 1 }.targeting(),
            RequestKind::Code
        );
        assert_eq!(
            Acknowledgement::Heartbeat { counter: 1 }.targeting(),
            RequestKind::Heartbeat
        );
        assert_eq!(
            Acknowledgement::HeartbeatError.targeting(),
            RequestKind::HeartbeatError
        );
    }

    #[test]
    fn test_message_type_name_for_heartbeat_error() {
        let msg = Message::HeartbeatError { counter: 3 };
        assert_eq!(msg.type_name(), "heartbeat_error");
    }
}
