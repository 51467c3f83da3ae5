//! Network infrastructure: discovery probes, the rendezvous race, and the
//! TCP session transport.

pub mod discovery;
pub mod rendezvous;
pub mod transport;

pub use rendezvous::{Rendezvous, RendezvousConfig};
pub use transport::TcpFrameTransport;
