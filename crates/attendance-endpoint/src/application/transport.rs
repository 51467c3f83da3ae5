//! Frame transport seam between the session use cases and the socket.
//!
//! The handshake and session loop only need "send one frame" and "receive
//! one frame or time out".  Abstracting this behind [`FrameTransport`] lets
//! the use cases be tested with `mockall` doubles instead of real sockets,
//! while `infrastructure::network::transport` provides the TCP
//! implementation.

use std::time::Duration;

use async_trait::async_trait;
use attendance_core::{encode_message, expect_acknowledgement, Acknowledgement, Message, RequestKind};

use crate::error::EndpointError;

/// A bidirectional stream of whole JSON frames.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameTransport: Send {
    /// Writes one encoded message to the peer.
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), EndpointError>;

    /// Waits up to `timeout` for the next complete frame.
    ///
    /// Returns `Ok(None)` when the timeout elapses with no frame, and
    /// [`EndpointError::TransportClosed`] when the peer closed the stream.
    async fn recv_frame(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, EndpointError>;
}

/// Encodes `msg` and sends it as one frame.
pub async fn send_message<T>(transport: &mut T, msg: &Message) -> Result<(), EndpointError>
where
    T: FrameTransport + ?Sized,
{
    let frame = encode_message(msg)?;
    transport.send_frame(&frame).await
}

/// Receives one frame and validates it as an acknowledgement of `kind`.
///
/// `Ok(None)` means nothing arrived within `timeout`.  A frame that arrives
/// but is not an acknowledgement of `kind` is a protocol error.
pub async fn recv_acknowledgement<T>(
    transport: &mut T,
    kind: RequestKind,
    timeout: Duration,
) -> Result<Option<Acknowledgement>, EndpointError>
where
    T: FrameTransport + ?Sized,
{
    match transport.recv_frame(timeout).await? {
        Some(frame) => Ok(Some(expect_acknowledgement(&frame, kind)?)),
        None => Ok(None),
    }
}
