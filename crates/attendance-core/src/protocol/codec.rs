//! JSON codec for encoding and decoding attendance protocol messages.
//!
//! Wire format: one compact UTF-8 JSON object per message, no length prefix
//! and no trailing delimiter.
//!
//! ```text
//! {"type":"heartbeat","counter":7}
//! ```
//!
//! Decoding is deliberately strict about the envelope (must be an object with
//! a known string `type`) and lenient about extra fields, which are ignored.

use serde_json::Value;
use thiserror::Error;

use crate::protocol::messages::{Acknowledgement, Message, RequestKind};

/// Wire names accepted in the `type` field.
const KNOWN_TYPES: [&str; 6] = [
    "discovery",
    "connect",
    "acknowledge",
    "code",
    "heartbeat",
    "heartbeat_error",
];

/// Errors that can occur during message encoding or decoding.
#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    /// The bytes are not valid UTF-8 JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// The JSON value is valid but is not an object.
    #[error("message is not a JSON object")]
    NotAnObject,

    /// The object has no string `type` field.
    #[error("message has no `type` field")]
    MissingType,

    /// The `type` field names a message kind this protocol does not define.
    #[error("unknown message type: {0}")]
    UnknownType(String),

    /// An `acknowledge` object has no string `targeting` field.
    #[error("acknowledgement has no `targeting` field")]
    MissingTarget,

    /// A required field is missing or has the wrong JSON type.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A reply was expected but a different message kind arrived.
    #[error("expected {expected}, got {got}")]
    UnexpectedMessage {
        expected: &'static str,
        got: &'static str,
    },

    /// An acknowledgement arrived for a different request kind.
    #[error("acknowledgement targets {got}, expected {expected}")]
    WrongTarget {
        expected: RequestKind,
        got: RequestKind,
    },

    /// The message could not be serialized.
    #[error("failed to encode message: {0}")]
    Encode(String),
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a [`Message`] into compact JSON bytes.
///
/// # Errors
///
/// Returns [`ProtocolError::Encode`] if serialization fails.
///
/// # Examples
///
/// ```rust
/// use attendance_core::protocol::{encode_message, Message};
///
/// let bytes = encode_message(&Message::Connect).unwrap();
/// assert_eq!(bytes, br#"{"type":"connect"}"#);
/// ```
pub fn encode_message(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    serde_json::to_vec(msg).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decodes exactly one [`Message`] from `bytes`.
///
/// # Errors
///
/// Returns [`ProtocolError`] if the bytes are not a well-formed message.
///
/// # Examples
///
/// ```rust
/// use attendance_core::protocol::{decode_message, Message};
///
/// let msg = decode_message(br#"{"type":"heartbeat","counter":3}"#).unwrap();
/// assert_eq!(msg, Message::Heartbeat { counter: 3 });
/// ```
pub fn decode_message(bytes: &[u8]) -> Result<Message, ProtocolError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let object = value.as_object().ok_or(ProtocolError::NotAnObject)?;
    let type_name = match object.get("type") {
        Some(Value::String(name)) => name.clone(),
        _ => return Err(ProtocolError::MissingType),
    };
    if !KNOWN_TYPES.contains(&type_name.as_str()) {
        return Err(ProtocolError::UnknownType(type_name));
    }
    if type_name == "acknowledge" && !matches!(object.get("targeting"), Some(Value::String(_))) {
        return Err(ProtocolError::MissingTarget);
    }

    serde_json::from_value(value).map_err(|e| ProtocolError::MalformedPayload(e.to_string()))
}

/// Decodes `bytes` and requires an `acknowledge` targeting `expected`.
///
/// This is the single check applied to every reply the endpoint waits for.
///
/// # Errors
///
/// Returns [`ProtocolError::UnexpectedMessage`] when a non-acknowledgement
/// arrives, [`ProtocolError::WrongTarget`] when the acknowledgement answers a
/// different request, and any decoding error from [`decode_message`].
///
/// # Examples
///
/// ```rust
/// use attendance_core::protocol::{expect_acknowledgement, Acknowledgement, RequestKind};
///
/// let ack = expect_acknowledgement(
///     br#"{"type":"acknowledge","targeting":"code","valid_to":60}"#,
///     RequestKind::Code,
/// )
/// .unwrap();
/// assert_eq!(ack, Acknowledgement::Code { valid_to: 60 });
/// ```
pub fn expect_acknowledgement(
    bytes: &[u8],
    expected: RequestKind,
) -> Result<Acknowledgement, ProtocolError> {
    match decode_message(bytes)? {
        Message::Acknowledge(ack) if ack.targeting() == expected => Ok(ack),
        Message::Acknowledge(ack) => Err(ProtocolError::WrongTarget {
            expected,
            got: ack.targeting(),
        }),
        other => Err(ProtocolError::UnexpectedMessage {
            expected: "acknowledge",
            got: other.type_name(),
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::messages::{CodeMessage, DiscoveryMessage};

    fn encode_str(msg: &Message) -> String {
        String::from_utf8(encode_message(msg).unwrap()).unwrap()
    }

    // ── Encoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_encode_connect_is_type_only() {
        assert_eq!(encode_str(&Message::Connect), r#"{"type":"connect"}"#);
    }

    #[test]
    fn test_encode_discovery_has_flat_fields() {
        // Arrange
        let msg = Message::Discovery(DiscoveryMessage::new("192.168.1.20"));

        // Act
        let value: Value = serde_json::from_slice(&encode_message(&msg).unwrap()).unwrap();

        // Assert
        assert_eq!(value["type"], "discovery");
        assert_eq!(value["app"], "attendance");
        assert_eq!(value["version"], 1);
        assert_eq!(value["host"], "192.168.1.20");
    }

    #[test]
    fn test_encode_code_has_generation_time() {
        let msg = Message::Code(CodeMessage {
            code: 4242,
            generation_time: 1_700_000_000,
        });
        let value: Value = serde_json::from_slice(&encode_message(&msg).unwrap()).unwrap();
        assert_eq!(value["type"], "code");
        assert_eq!(value["code"], 4242);
        assert_eq!(value["generation_time"], 1_700_000_000u64);
    }

    #[test]
    fn test_encode_heartbeat_error_uses_snake_case_type() {
        let json = encode_str(&Message::HeartbeatError { counter: 9 });
        assert!(json.contains(r#""type":"heartbeat_error""#), "got {json}");
        assert!(json.contains(r#""counter":9"#), "got {json}");
    }

    #[test]
    fn test_encode_acknowledge_flattens_targeting() {
        let msg = Message::Acknowledge(Acknowledgement::Heartbeat { counter: 4 });
        let value: Value = serde_json::from_slice(&encode_message(&msg).unwrap()).unwrap();
        assert_eq!(value["type"], "acknowledge");
        assert_eq!(value["targeting"], "heartbeat");
        assert_eq!(value["counter"], 4);
    }

    // ── Decoding ──────────────────────────────────────────────────────────────

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let msg = decode_message(br#"{"type":"heartbeat","counter":1,"extra":true}"#).unwrap();
        assert_eq!(msg, Message::Heartbeat { counter: 1 });
    }

    #[test]
    fn test_decode_rejects_non_json() {
        let result = decode_message(b"hello there");
        assert!(matches!(result, Err(ProtocolError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        let result = decode_message(&[0xFF, 0xFE, 0x7B]);
        assert!(matches!(result, Err(ProtocolError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_empty_input() {
        let result = decode_message(b"");
        assert!(matches!(result, Err(ProtocolError::InvalidJson(_))));
    }

    #[test]
    fn test_decode_rejects_array() {
        assert_eq!(decode_message(b"[1,2,3]"), Err(ProtocolError::NotAnObject));
    }

    #[test]
    fn test_decode_rejects_missing_type() {
        assert_eq!(
            decode_message(br#"{"counter":1}"#),
            Err(ProtocolError::MissingType)
        );
    }

    #[test]
    fn test_decode_rejects_non_string_type() {
        assert_eq!(
            decode_message(br#"{"type":5}"#),
            Err(ProtocolError::MissingType)
        );
    }

    #[test]
    fn test_decode_rejects_unknown_type() {
        assert_eq!(
            decode_message(br#"{"type":"goodbye"}"#),
            Err(ProtocolError::UnknownType("goodbye".to_string()))
        );
    }

    #[test]
    fn test_decode_rejects_acknowledge_without_targeting() {
        assert_eq!(
            decode_message(br#"{"type":"acknowledge"}"#),
            Err(ProtocolError::MissingTarget)
        );
    }

    #[test]
    fn test_decode_rejects_heartbeat_without_counter() {
        let result = decode_message(br#"{"type":"heartbeat"}"#);
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    #[test]
    fn test_decode_rejects_code_ack_without_valid_to() {
        let result = decode_message(br#"{"type":"acknowledge","targeting":"code"}"#);
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }

    // ── expect_acknowledgement ────────────────────────────────────────────────

    #[test]
    fn test_expect_acknowledgement_accepts_connect_ack() {
        let ack = expect_acknowledgement(
            br#"{"type":"acknowledge","targeting":"connect"}"#,
            RequestKind::Connect,
        );
        assert_eq!(ack, Ok(Acknowledgement::Connect));
    }

    #[test]
    fn test_expect_acknowledgement_accepts_heartbeat_error_ack() {
        let ack = expect_acknowledgement(
            br#"{"type":"acknowledge","targeting":"heartbeat_error"}"#,
            RequestKind::HeartbeatError,
        );
        assert_eq!(ack, Ok(Acknowledgement::HeartbeatError));
    }

    #[test]
    fn test_expect_acknowledgement_rejects_wrong_target() {
        let result = expect_acknowledgement(
            br#"{"type":"acknowledge","targeting":"connect"}"#,
            RequestKind::Code,
        );
        assert_eq!(
            result,
            Err(ProtocolError::WrongTarget {
                expected: RequestKind::Code,
                got: RequestKind::Connect,
            })
        );
    }

    #[test]
    fn test_expect_acknowledgement_rejects_other_message_kind() {
        let result = expect_acknowledgement(br#"{"type":"connect"}"#, RequestKind::Connect);
        assert_eq!(
            result,
            Err(ProtocolError::UnexpectedMessage {
                expected: "acknowledge",
                got: "connect",
            })
        );
    }

    #[test]
    fn test_expect_acknowledgement_rejects_unknown_target() {
        let result = expect_acknowledgement(
            br#"{"type":"acknowledge","targeting":"pairing"}"#,
            RequestKind::Connect,
        );
        assert!(matches!(result, Err(ProtocolError::MalformedPayload(_))));
    }
}
