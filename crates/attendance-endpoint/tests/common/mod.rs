//! Scripted fake peer shared by the endpoint integration tests.
//!
//! The peer listens for discovery probes on a loopback UDP port, connects
//! back to the host named in the probe, and answers the handshake.  Tests
//! then drive the session message by message with [`PeerSession`].

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use attendance_endpoint::config::EndpointConfig;
use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, UdpSocket};

pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Returns a currently-free local port (bind to 0, read, release).
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Endpoint configuration aimed at a [`FakePeer`] with test-sized timings.
pub fn config_for(peer: &FakePeer, idle: Duration) -> EndpointConfig {
    let mut config = EndpointConfig::default();
    config.known_hosts = vec![peer.probe_addr().to_string()];
    config.max_tries = 0;
    config.rendezvous.listen_addr = SocketAddr::from(([127, 0, 0, 1], peer.listen_port));
    config.rendezvous.discovery_interval = Duration::from_millis(100);
    config.rendezvous.handshake_timeout = Duration::from_secs(2);
    config.session.idle_timeout = idle;
    config.session.ack_timeout = Duration::from_millis(500);
    config.reconnect_delay = Duration::from_millis(50);
    config
}

pub struct FakePeer {
    udp: UdpSocket,
    /// TCP port the endpoint under test listens on.
    pub listen_port: u16,
}

impl FakePeer {
    pub async fn bind() -> Self {
        Self {
            udp: UdpSocket::bind("127.0.0.1:0").await.unwrap(),
            listen_port: free_port(),
        }
    }

    /// Address the endpoint should send probes to.
    pub fn probe_addr(&self) -> SocketAddr {
        self.udp.local_addr().unwrap()
    }

    /// Waits for a probe and returns it decoded.
    pub async fn recv_probe(&self) -> Value {
        let mut buf = [0u8; 1024];
        let (len, _) = tokio::time::timeout(STEP_TIMEOUT, self.udp.recv_from(&mut buf))
            .await
            .expect("no discovery probe")
            .unwrap();
        serde_json::from_slice(&buf[..len]).unwrap()
    }

    /// Answers a probe by connecting back and acknowledging the handshake.
    pub async fn accept_endpoint(&self) -> PeerSession {
        let probe = self.recv_probe().await;
        assert_eq!(probe["type"], "discovery");
        assert_eq!(probe["app"], "attendance");
        let host = probe["host"].as_str().unwrap().to_string();

        let stream = TcpStream::connect((host.as_str(), self.listen_port))
            .await
            .expect("connect back to endpoint");
        let mut session = PeerSession {
            stream,
            buf: Vec::new(),
        };
        assert_eq!(session.recv().await, json!({"type": "connect"}));
        session
            .send(json!({"type": "acknowledge", "targeting": "connect"}))
            .await;
        session
    }
}

/// The peer's side of one session connection.
pub struct PeerSession {
    stream: TcpStream,
    buf: Vec<u8>,
}

impl PeerSession {
    /// Reads the next JSON object sent by the endpoint.
    pub async fn recv(&mut self) -> Value {
        loop {
            let parsed = {
                let mut values =
                    serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
                match values.next() {
                    Some(Ok(v)) => Some((v, values.byte_offset())),
                    _ => None,
                }
            };
            if let Some((value, used)) = parsed {
                self.buf.drain(..used);
                return value;
            }

            let mut chunk = [0u8; 1024];
            let n = tokio::time::timeout(STEP_TIMEOUT, self.stream.read(&mut chunk))
                .await
                .expect("endpoint sent nothing")
                .unwrap();
            assert!(n > 0, "endpoint closed the session");
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }

    pub async fn send(&mut self, value: Value) {
        let bytes = serde_json::to_vec(&value).unwrap();
        self.stream.write_all(&bytes).await.unwrap();
    }

    /// Closes the connection from the peer side.
    pub async fn close(mut self) {
        let _ = self.stream.shutdown().await;
    }
}
