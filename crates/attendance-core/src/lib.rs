//! # attendance-core
//!
//! Shared library for the attendance endpoint containing the JSON wire
//! protocol, the domain types exchanged over it, and the periodic task
//! multiplexer used to schedule UI refresh and code generation.
//!
//! It has no dependency on an async runtime or on network sockets, so every
//! type here can be exercised from plain unit tests.
//!
//! # Architecture overview
//!
//! An attendance *endpoint* is a small device that shows short-lived
//! verification codes.  Each code must be registered with a *peer* (the
//! attendance server) on the same LAN, which answers with the instant the code
//! stops being valid.  Between codes the two sides exchange heartbeats so
//! either one notices quickly when the link drops.
//!
//! - **`protocol`** – The message set and its JSON encoding.  Every message
//!   is a flat object with a `type` field; replies also name the request
//!   they acknowledge in a `targeting` field.
//!
//! - **`domain`** – Verification codes, the connection state enum, and the
//!   heartbeat counter both sides keep in lock-step.
//!
//! - **`scheduler`** – Many logical timers multiplexed over one physical
//!   clock tick.

pub mod domain;
pub mod protocol;
pub mod scheduler;

// Re-export the most-used types at the crate root so callers can write
// `attendance_core::VerificationCode` instead of the full module path.
pub use domain::code::VerificationCode;
pub use domain::heartbeat::HeartbeatCounter;
pub use domain::state::ConnectionState;
pub use protocol::codec::{decode_message, encode_message, expect_acknowledgement, ProtocolError};
pub use protocol::messages::{Acknowledgement, Message, RequestKind};
pub use scheduler::{TaskHandle, TaskMultiplexer};
