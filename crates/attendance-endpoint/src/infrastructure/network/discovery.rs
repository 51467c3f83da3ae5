//! UDP discovery probes.
//!
//! The endpoint announces itself by sending a small JSON datagram to a
//! target address (a known host, or the limited broadcast address
//! `255.255.255.255`) on the discovery port:
//!
//! ```json
//! {"type":"discovery","app":"attendance","version":1,"host":"192.168.1.42"}
//! ```
//!
//! `host` tells the peer where to open the TCP connection back.  Probes are
//! fire-and-forget: UDP gives no delivery guarantee, so a probe that cannot
//! be sent is logged and counted like one that was lost on the wire.  The
//! rendezvous loop decides how many to send.

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use attendance_core::protocol::messages::DiscoveryMessage;
use attendance_core::{encode_message, Message};
use tokio::net::UdpSocket;
use tracing::{debug, warn};

use crate::error::EndpointError;

/// Sends discovery probes to one target address.
pub struct DiscoveryProber {
    socket: UdpSocket,
    target: SocketAddr,
    probe: Vec<u8>,
    sent: u32,
}

impl DiscoveryProber {
    /// Binds an ephemeral broadcast-capable UDP socket for probing `target`.
    ///
    /// `host` is the address advertised in every probe.
    pub async fn bind(target: SocketAddr, host: &str) -> Result<Self, EndpointError> {
        let socket = UdpSocket::bind(unspecified_for(target)).await?;
        socket.set_broadcast(true)?;
        let probe = encode_message(&Message::Discovery(DiscoveryMessage::new(host)))?;
        debug!("discovery probe for {target} advertises host {host}");
        Ok(Self {
            socket,
            target,
            probe,
            sent: 0,
        })
    }

    /// Sends one probe.  Returns `false` if the socket rejected it.
    pub async fn send_probe(&mut self) -> bool {
        self.sent += 1;
        match self.socket.send_to(&self.probe, self.target).await {
            Ok(_) => {
                debug!("discovery probe {} sent to {}", self.sent, self.target);
                true
            }
            Err(e) => {
                warn!("discovery probe {} to {} failed: {e}", self.sent, self.target);
                false
            }
        }
    }

    /// Number of probes attempted so far.
    pub fn probes_sent(&self) -> u32 {
        self.sent
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

/// Returns the local IP the OS would use to reach `target`.
///
/// Connecting a UDP socket only selects a route; no packet is sent.
/// Returns `None` when there is no route or the result is unspecified.
pub async fn local_ip_for(target: SocketAddr) -> Option<IpAddr> {
    let probe_route = async {
        let socket = UdpSocket::bind(unspecified_for(target)).await?;
        socket.set_broadcast(true)?;
        socket.connect(target).await?;
        Ok::<_, io::Error>(socket.local_addr()?.ip())
    };
    match probe_route.await {
        Ok(ip) if !ip.is_unspecified() => Some(ip),
        Ok(_) => None,
        Err(e) => {
            debug!("no route to {target}: {e}");
            None
        }
    }
}

/// Picks the host string to advertise when probing `target`.
///
/// An explicit `configured` value wins; otherwise the local IP of the route
/// to `target`, falling back to the unspecified address.
pub async fn advertised_host_for(target: SocketAddr, configured: Option<&str>) -> String {
    if let Some(host) = configured {
        return host.to_string();
    }
    match local_ip_for(target).await {
        Some(ip) => ip.to_string(),
        None => {
            let fallback = match target {
                SocketAddr::V4(_) => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                SocketAddr::V6(_) => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
            };
            warn!("could not determine local address towards {target}; advertising {fallback}");
            fallback.to_string()
        }
    }
}

fn unspecified_for(target: SocketAddr) -> SocketAddr {
    match target {
        SocketAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
        SocketAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
