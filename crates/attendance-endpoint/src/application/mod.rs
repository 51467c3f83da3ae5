//! Application layer for attendance-endpoint.
//!
//! Contains the use cases that run over an established connection and the
//! state they share with the rest of the endpoint.  Nothing here touches a
//! socket directly: the use cases talk to the peer through the
//! [`transport::FrameTransport`] trait, implemented in
//! `infrastructure::network`.

pub mod handshake;
pub mod outbox;
pub mod session;
pub mod state_machine;
pub mod transport;
