//! Criterion benchmarks for the attendance JSON codec.
//!
//! Every session exchange encodes one request and validates one reply, so
//! these two paths bound the per-message CPU cost of the session loop.
//!
//! Run with:
//! ```bash
//! cargo bench --package attendance-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use attendance_core::protocol::messages::{CodeMessage, DiscoveryMessage};
use attendance_core::{decode_message, encode_message, expect_acknowledgement, Message, RequestKind};

// ── Message fixtures ──────────────────────────────────────────────────────────

fn requests() -> Vec<(&'static str, Message)> {
    vec![
        (
            "discovery",
            Message::Discovery(DiscoveryMessage::new("192.168.1.42")),
        ),
        ("connect", Message::Connect),
        (
            "code",
            Message::Code(CodeMessage {
                code: 987_654_321,
                generation_time: 1_700_000_000,
            }),
        ),
        ("heartbeat", Message::Heartbeat { counter: 1234 }),
        ("heartbeat_error", Message::HeartbeatError { counter: 1234 }),
    ]
}

fn replies() -> Vec<(&'static str, RequestKind, &'static [u8])> {
    vec![
        (
            "connect",
            RequestKind::Connect,
            br#"{"type":"acknowledge","targeting":"connect"}"#,
        ),
        (
            "code",
            RequestKind::Code,
            br#"{"type":"acknowledge","targeting":"code","valid_to":1700000060}"#,
        ),
        (
            "heartbeat",
            RequestKind::Heartbeat,
            br#"{"type":"acknowledge","targeting":"heartbeat","counter":1234}"#,
        ),
    ]
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for (name, msg) in requests() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &msg, |b, msg| {
            b.iter(|| encode_message(black_box(msg)).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (name, msg) in requests() {
        let bytes = encode_message(&msg).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| decode_message(black_box(bytes)).unwrap())
        });
    }
    group.finish();
}

fn bench_expect_acknowledgement(c: &mut Criterion) {
    let mut group = c.benchmark_group("expect_acknowledgement");
    for (name, kind, bytes) in replies() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &bytes, |b, bytes| {
            b.iter(|| expect_acknowledgement(black_box(bytes), kind).unwrap())
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_encode,
    bench_decode,
    bench_expect_acknowledgement
);
criterion_main!(benches);
