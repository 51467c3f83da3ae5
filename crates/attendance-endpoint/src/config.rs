//! Endpoint runtime configuration.
//!
//! [`EndpointConfig`] gathers every setting the endpoint needs.  The binary
//! builds it from the optional TOML file (see
//! `infrastructure::storage::config`) and then applies CLI overrides;
//! tests construct it directly with short timings.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use attendance_core::scheduler::DEFAULT_TICK_PERIOD;

use crate::application::session::SessionSettings;
use crate::infrastructure::network::rendezvous::{RendezvousConfig, DEFAULT_PORT};

/// All runtime configuration for one endpoint.
///
/// # Example
///
/// ```rust
/// use attendance_endpoint::config::EndpointConfig;
///
/// let cfg = EndpointConfig::default();
/// assert_eq!(cfg.rendezvous.discovery_port, 5789);
/// assert_eq!(cfg.session.max_attempts, 3);
/// assert_eq!(cfg.max_tries, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Ports, discovery interval, and handshake timeout.
    pub rendezvous: RendezvousConfig,
    /// Idle, acknowledgement, and retry settings of the session loop.
    pub session: SessionSettings,
    /// Probes per host before giving up (0 = unlimited).
    pub max_tries: u32,
    /// Hosts to probe in order; empty means broadcast.
    pub known_hosts: Vec<String>,
    /// Pause between a failed session and the next discovery.
    pub reconnect_delay: Duration,
    /// Physical tick period of the task multiplexer.
    pub tick_period: Duration,
}

impl Default for EndpointConfig {
    /// | Field              | Default        |
    /// |--------------------|----------------|
    /// | discovery_port     | 5789           |
    /// | listen_addr        | `0.0.0.0:5789` |
    /// | discovery_interval | 5 s            |
    /// | handshake_timeout  | 5 s            |
    /// | idle_timeout       | 10 s           |
    /// | ack_timeout        | 1 s            |
    /// | max_attempts       | 3              |
    /// | max_tries          | 0 (unlimited)  |
    /// | reconnect_delay    | 1 s            |
    /// | tick_period        | 100 ms         |
    fn default() -> Self {
        Self {
            rendezvous: RendezvousConfig::default(),
            session: SessionSettings::default(),
            max_tries: 0,
            known_hosts: Vec::new(),
            reconnect_delay: Duration::from_secs(1),
            tick_period: DEFAULT_TICK_PERIOD,
        }
    }
}

impl EndpointConfig {
    /// Sets the TCP listen port, keeping the bind IP.
    pub fn set_listen_port(&mut self, port: u16) {
        self.rendezvous.listen_addr.set_port(port);
    }
}

/// Splits a comma-separated host list, trimming blanks and dropping empty
/// entries.
///
/// ```rust
/// use attendance_endpoint::config::parse_host_list;
///
/// assert_eq!(parse_host_list(" 10.0.0.2, ,host.lan "), vec!["10.0.0.2", "host.lan"]);
/// assert!(parse_host_list("").is_empty());
/// ```
pub fn parse_host_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

/// Listen address for `port` on all IPv4 interfaces.
pub fn any_interface(port: u16) -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))
}
