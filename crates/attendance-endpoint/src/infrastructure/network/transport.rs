//! TCP implementation of [`FrameTransport`].
//!
//! Frames on the session socket are bare JSON objects with no length prefix
//! or delimiter.  Bytes are accumulated in a receive buffer and split with
//! serde_json's streaming deserializer, so several objects coalesced into
//! one read (or one object split across reads) are handled correctly.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::IgnoredAny;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;
use uuid::Uuid;

use crate::application::transport::FrameTransport;
use crate::error::EndpointError;

const READ_CHUNK: usize = 1024;

/// One session connection to the peer.
pub struct TcpFrameTransport {
    stream: TcpStream,
    session_id: Uuid,
    peer: Option<SocketAddr>,
    recv_buf: Vec<u8>,
}

impl TcpFrameTransport {
    pub fn new(stream: TcpStream, session_id: Uuid) -> Self {
        let peer = stream.peer_addr().ok();
        // Frames are tiny request/reply pairs.
        let _ = stream.set_nodelay(true);
        Self {
            stream,
            session_id,
            peer,
            recv_buf: Vec::with_capacity(READ_CHUNK),
        }
    }

    /// Identifier attached to this session's log lines.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }
}

#[async_trait]
impl FrameTransport for TcpFrameTransport {
    async fn send_frame(&mut self, frame: &[u8]) -> Result<(), EndpointError> {
        debug!(session = %self.session_id, "-> {}", String::from_utf8_lossy(frame));
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn recv_frame(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, EndpointError> {
        if let Some(frame) = split_frame(&mut self.recv_buf) {
            return Ok(Some(frame));
        }

        let deadline = tokio::time::Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let n = match tokio::time::timeout_at(deadline, self.stream.read(&mut chunk)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => {
                    debug!(session = %self.session_id, "peer closed the connection");
                    return Err(EndpointError::TransportClosed);
                }
                Ok(Ok(n)) => n,
                Ok(Err(e)) => return Err(e.into()),
            };
            self.recv_buf.extend_from_slice(&chunk[..n]);

            if let Some(frame) = split_frame(&mut self.recv_buf) {
                debug!(session = %self.session_id, "<- {}", String::from_utf8_lossy(&frame));
                return Ok(Some(frame));
            }
        }
    }
}

/// Removes the first complete JSON value from `buf` and returns its bytes.
///
/// Returns `None` while the value is still incomplete.  Bytes that can never
/// form valid JSON are returned whole so the codec rejects them.
fn split_frame(buf: &mut Vec<u8>) -> Option<Vec<u8>> {
    let Some(start) = buf.iter().position(|b| !b.is_ascii_whitespace()) else {
        buf.clear();
        return None;
    };

    let end = {
        let mut values =
            serde_json::Deserializer::from_slice(&buf[start..]).into_iter::<IgnoredAny>();
        match values.next() {
            Some(Ok(_)) => start + values.byte_offset(),
            Some(Err(e)) if e.is_eof() => return None,
            Some(Err(_)) => buf.len(),
            None => return None,
        }
    };
    let frame = buf[start..end].to_vec();
    buf.drain(..end);
    Some(frame)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
