//! Connection rendezvous: UDP discovery racing a TCP listener.
//!
//! The endpoint does not connect *to* the peer.  Instead, for each candidate
//! host it:
//!
//! 1. Binds a TCP listener on the listen port.
//! 2. Sends a UDP discovery probe to the host (or the broadcast address)
//!    and accepts for up to one discovery interval, waiting for the peer to
//!    connect back.
//! 3. Repeats step 2 until a connection is accepted or the try budget is
//!    spent, then closes the listener.  Dropping the `connect` future closes
//!    it too.
//!
//! An accepted connection is handshaken immediately.  Hosts are tried in
//! order and the first successful handshake wins.
//!
//! # State transitions
//!
//! ```text
//! connect() ──► Disconnected
//!   per host ─► SearchingForHosts ─(accepted)─► Connecting ─(handshake ok)─► return
//!                                              └─(handshake failed)─► Disconnected
//!   all hosts failed ─► Disconnected (if not already)
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use attendance_core::ConnectionState;
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::handshake::perform_handshake;
use crate::application::state_machine::ConnectionStateMachine;
use crate::error::EndpointError;
use crate::infrastructure::network::discovery::{advertised_host_for, DiscoveryProber};
use crate::infrastructure::network::transport::TcpFrameTransport;

/// Default port for both the discovery target and the TCP listener.
pub const DEFAULT_PORT: u16 = 5789;

/// Default wait for a connect-back after each probe.
pub const DEFAULT_DISCOVERY_INTERVAL: Duration = Duration::from_secs(5);

/// Default wait for the handshake acknowledgement.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Network parameters of the rendezvous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendezvousConfig {
    /// UDP port probes are sent to.
    pub discovery_port: u16,
    /// Address the TCP listener binds.
    pub listen_addr: SocketAddr,
    /// Wait after each probe before probing again.
    pub discovery_interval: Duration,
    /// Wait for the handshake acknowledgement.
    pub handshake_timeout: Duration,
    /// Host advertised in probes; detected from the route when `None`.
    pub advertised_host: Option<String>,
}

impl Default for RendezvousConfig {
    fn default() -> Self {
        Self {
            discovery_port: DEFAULT_PORT,
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            discovery_interval: DEFAULT_DISCOVERY_INTERVAL,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            advertised_host: None,
        }
    }
}

/// Finds a peer and returns a handshaken session transport.
pub struct Rendezvous {
    config: RendezvousConfig,
    state: Arc<ConnectionStateMachine>,
}

impl Rendezvous {
    pub fn new(config: RendezvousConfig, state: Arc<ConnectionStateMachine>) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &RendezvousConfig {
        &self.config
    }

    /// Tries each of `known_hosts` in order (the broadcast address when the
    /// list is empty), sending at most `max_tries` probes per host.
    ///
    /// `max_tries == 0` probes without limit.
    ///
    /// # Errors
    ///
    /// If every host fails, the state ends `Disconnected` and the last
    /// host's error is returned.
    pub async fn connect(
        &self,
        max_tries: u32,
        known_hosts: &[String],
    ) -> Result<TcpFrameTransport, EndpointError> {
        self.state.transition(ConnectionState::Disconnected);

        let broadcast = [Ipv4Addr::BROADCAST.to_string()];
        let hosts: &[String] = if known_hosts.is_empty() {
            &broadcast
        } else {
            known_hosts
        };

        let mut last_error = None;
        for host in hosts {
            match self.try_host(host, max_tries).await {
                Ok(transport) => return Ok(transport),
                Err(e) => {
                    warn!("could not connect via host {host}: {e}");
                    last_error = Some(e);
                }
            }
        }

        error!("no good host found among {} candidate(s)", hosts.len());
        self.state.transition_if_changed(ConnectionState::Disconnected);
        Err(last_error.unwrap_or(EndpointError::Discovery { attempts: 0 }))
    }

    async fn try_host(&self, host: &str, max_tries: u32) -> Result<TcpFrameTransport, EndpointError> {
        let target = self.resolve(host).await?;
        let (stream, peer) = self.discover(target, max_tries).await?;

        self.state.transition(ConnectionState::Connecting);
        let session_id = Uuid::new_v4();
        info!(session = %session_id, "peer {peer} connected back; handshaking");

        let mut transport = TcpFrameTransport::new(stream, session_id);
        if let Err(e) = perform_handshake(&mut transport, self.config.handshake_timeout).await {
            self.state.transition(ConnectionState::Disconnected);
            return Err(e);
        }
        info!(session = %session_id, "handshake with {peer} complete");
        Ok(transport)
    }

    /// Accepts either `ip:port`, a bare IP (discovery port implied), or a
    /// host name.
    async fn resolve(&self, host: &str) -> Result<SocketAddr, EndpointError> {
        if let Ok(addr) = host.parse::<SocketAddr>() {
            return Ok(addr);
        }
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.config.discovery_port));
        }
        lookup_host((host, self.config.discovery_port))
            .await
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| EndpointError::InvalidHost(host.to_string()))
    }

    /// Runs the probe/accept race against one target.
    async fn discover(
        &self,
        target: SocketAddr,
        max_tries: u32,
    ) -> Result<(TcpStream, SocketAddr), EndpointError> {
        self.state.transition(ConnectionState::SearchingForHosts);

        let listener = TcpListener::bind(self.config.listen_addr).await?;
        debug!("listening for peer on {}", listener.local_addr()?);
        let host = advertised_host_for(target, self.config.advertised_host.as_deref()).await;
        let mut prober = DiscoveryProber::bind(target, &host).await?;

        // Dropping this future closes the listener; `accept` is cancel safe.
        loop {
            if max_tries != 0 && prober.probes_sent() >= max_tries {
                return Err(EndpointError::Discovery {
                    attempts: prober.probes_sent(),
                });
            }
            prober.send_probe().await;
            tokio::select! {
                accepted = listener.accept() => return Ok(accepted?),
                _ = tokio::time::sleep(self.config.discovery_interval) => debug!(
                    "no connect-back from {target} after probe {}",
                    prober.probes_sent()
                ),
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
