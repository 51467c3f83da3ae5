//! Domain entities for the attendance endpoint.
//!
//! This module contains pure data and rules with no infrastructure
//! dependencies: no sockets, no async runtime, no clocks other than the
//! `SystemTime` values callers pass in.

/// Verification codes and epoch-second conversions.
pub mod code;

/// Heartbeat counter kept in lock-step with the peer.
pub mod heartbeat;

/// Connection lifecycle states.
pub mod state;
