//! attendance-endpoint library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the endpoint do?
//!
//! The endpoint is the device that displays verification codes.  It:
//!
//! 1. Finds a peer on the LAN by sending UDP discovery probes while listening
//!    for the peer to open a TCP connection back (the *rendezvous race*).
//! 2. Performs a one-message handshake on that connection.
//! 3. Runs the session loop: every submitted code is sent and acknowledged
//!    with an expiry; when no code is pending a heartbeat keeps both sides'
//!    counters in step.
//! 4. Reports every connection state change to registered listeners, and
//!    reconnects forever after any failure.
//!
//! [`Endpoint`] bundles these pieces behind one handle.

/// Application layer: session use cases and the traits they depend on.
pub mod application;

/// Runtime configuration and host-list parsing.
pub mod config;

/// Composition facade combining state, outbox, and network.
pub mod endpoint;

/// Error type shared by every endpoint operation.
pub mod error;

/// Infrastructure layer: sockets, tick driver, and configuration storage.
pub mod infrastructure;

pub use endpoint::Endpoint;
pub use error::EndpointError;
