//! Infrastructure layer for attendance-endpoint.
//!
//! Implements the I/O the application layer abstracts over:
//!
//! - `network`: UDP discovery, the TCP rendezvous, and the frame transport.
//! - `ticker`: Tokio interval driving the periodic task multiplexer.
//! - `storage`: TOML configuration file loading.

pub mod network;
pub mod storage;
pub mod ticker;
