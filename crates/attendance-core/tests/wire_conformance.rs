//! Integration tests for the attendance wire protocol.
//!
//! These tests pin the exact JSON shapes exchanged with a peer, using
//! literal payloads as a peer implementation would produce them, and check
//! the reply-validation rules the endpoint applies to each exchange.

use attendance_core::{
    decode_message, encode_message, expect_acknowledgement,
    domain::code::{from_epoch_secs, to_epoch_secs},
    protocol::messages::{CodeMessage, DiscoveryMessage},
    Acknowledgement, Message, ProtocolError, RequestKind, VerificationCode,
};
use serde_json::{json, Value};

fn as_json(msg: &Message) -> Value {
    serde_json::from_slice(&encode_message(msg).expect("encode must succeed"))
        .expect("encoded bytes must be JSON")
}

#[test]
fn test_discovery_probe_shape() {
    let msg = Message::Discovery(DiscoveryMessage::new("192.168.0.12"));
    assert_eq!(
        as_json(&msg),
        json!({"app": "attendance", "type": "discovery", "version": 1, "host": "192.168.0.12"})
    );
}

#[test]
fn test_handshake_request_and_reply_shapes() {
    assert_eq!(as_json(&Message::Connect), json!({"type": "connect"}));

    let reply = br#"{"type":"acknowledge","targeting":"connect"}"#;
    assert_eq!(
        expect_acknowledgement(reply, RequestKind::Connect),
        Ok(Acknowledgement::Connect)
    );
}

#[test]
fn test_code_submission_exchange() {
    // Arrange: code 4242 generated at T
    let t = 1_700_000_000;
    let code = VerificationCode::new(4242, from_epoch_secs(t));

    // Act
    let request = as_json(&Message::Code(code.to_message()));
    let reply = format!(r#"{{"type":"acknowledge","targeting":"code","valid_to":{}}}"#, t + 60);
    let ack = expect_acknowledgement(reply.as_bytes(), RequestKind::Code).unwrap();

    // Assert
    assert_eq!(
        request,
        json!({"type": "code", "code": 4242, "generation_time": t})
    );
    match ack {
        Acknowledgement::Code { valid_to } => {
            let expiry = code.acknowledged(from_epoch_secs(valid_to));
            assert_eq!(to_epoch_secs(expiry.timestamp()), t + 60);
            assert_eq!(expiry.value(), 4242);
        }
        other => panic!("unexpected acknowledgement {other:?}"),
    }
}

#[test]
fn test_heartbeat_exchange_carries_peer_counter() {
    assert_eq!(
        as_json(&Message::Heartbeat { counter: 12 }),
        json!({"type": "heartbeat", "counter": 12})
    );

    let reply = br#"{"type":"acknowledge","targeting":"heartbeat","counter":11}"#;
    assert_eq!(
        expect_acknowledgement(reply, RequestKind::Heartbeat),
        Ok(Acknowledgement::Heartbeat { counter: 11 })
    );
}

#[test]
fn test_heartbeat_correction_exchange() {
    assert_eq!(
        as_json(&Message::HeartbeatError { counter: 12 }),
        json!({"type": "heartbeat_error", "counter": 12})
    );

    let reply = br#"{"type":"acknowledge","targeting":"heartbeat_error"}"#;
    assert_eq!(
        expect_acknowledgement(reply, RequestKind::HeartbeatError),
        Ok(Acknowledgement::HeartbeatError)
    );
}

#[test]
fn test_heartbeat_ack_without_counter_is_rejected() {
    let reply = br#"{"type":"acknowledge","targeting":"heartbeat"}"#;
    assert!(matches!(
        expect_acknowledgement(reply, RequestKind::Heartbeat),
        Err(ProtocolError::MalformedPayload(_))
    ));
}

#[test]
fn test_reply_to_wrong_request_is_rejected() {
    let reply = br#"{"type":"acknowledge","targeting":"heartbeat","counter":1}"#;
    assert_eq!(
        expect_acknowledgement(reply, RequestKind::Code),
        Err(ProtocolError::WrongTarget {
            expected: RequestKind::Code,
            got: RequestKind::Heartbeat,
        })
    );
}

#[test]
fn test_peer_can_decode_every_endpoint_request() {
    // Every request the endpoint emits must decode back to the same message,
    // which is what a conforming peer relies on.
    let requests = [
        Message::Discovery(DiscoveryMessage::new("10.1.1.1")),
        Message::Connect,
        Message::Code(CodeMessage {
            code: u64::MAX,
            generation_time: 0,
        }),
        Message::Heartbeat { counter: 0 },
        Message::HeartbeatError { counter: 99 },
    ];
    for request in requests {
        let bytes = encode_message(&request).unwrap();
        assert_eq!(decode_message(&bytes).unwrap(), request);
    }
}
