//! TOML configuration file for the endpoint.
//!
//! Every field is optional; anything missing falls back to the built-in
//! default, so an empty file (or no file at all) is a valid configuration.
//!
//! ```toml
//! log_level = "info"
//!
//! [network]
//! discovery_port = 5789
//! listen_port = 5789
//! bind_address = "0.0.0.0"
//! # advertised_host = "192.168.1.42"
//!
//! [discovery]
//! known_hosts = ["192.168.1.10", "attendance-server.lan"]
//! max_tries = 0
//! interval_ms = 5000
//!
//! [session]
//! idle_timeout_ms = 10000
//! ack_timeout_ms = 1000
//! handshake_timeout_ms = 5000
//! max_attempts = 3
//! reconnect_delay_ms = 1000
//!
//! [ticker]
//! tick_period_ms = 100
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::application::session::SessionSettings;
use crate::config::EndpointConfig;
use crate::infrastructure::network::rendezvous::RendezvousConfig;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// `bind_address` is not an IP address.
    #[error("invalid bind address {0:?}")]
    InvalidBindAddress(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration file contents.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub discovery: DiscoverySection,
    #[serde(default)]
    pub session: SessionSection,
    #[serde(default)]
    pub ticker: TickerSection,
}

/// Ports and addresses.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NetworkSection {
    /// UDP port discovery probes are sent to.
    #[serde(default = "default_port")]
    pub discovery_port: u16,
    /// TCP port the peer connects back to.
    #[serde(default = "default_port")]
    pub listen_port: u16,
    /// IP address the TCP listener binds.  `"0.0.0.0"` binds all interfaces.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Host placed in discovery probes; detected automatically when absent.
    #[serde(default)]
    pub advertised_host: Option<String>,
}

/// Which hosts to probe and how often.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DiscoverySection {
    /// Hosts tried in order; empty means broadcast.
    #[serde(default)]
    pub known_hosts: Vec<String>,
    /// Probes per host; 0 probes forever.
    #[serde(default)]
    pub max_tries: u32,
    #[serde(default = "default_discovery_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SessionSection {
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
    #[serde(default = "default_handshake_timeout_ms")]
    pub handshake_timeout_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TickerSection {
    #[serde(default = "default_tick_period_ms")]
    pub tick_period_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> u16 {
    5789
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_discovery_interval_ms() -> u64 {
    5_000
}
fn default_idle_timeout_ms() -> u64 {
    10_000
}
fn default_ack_timeout_ms() -> u64 {
    1_000
}
fn default_handshake_timeout_ms() -> u64 {
    5_000
}
fn default_max_attempts() -> u32 {
    3
}
fn default_reconnect_delay_ms() -> u64 {
    1_000
}
fn default_tick_period_ms() -> u64 {
    100
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            network: NetworkSection::default(),
            discovery: DiscoverySection::default(),
            session: SessionSection::default(),
            ticker: TickerSection::default(),
        }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            discovery_port: default_port(),
            listen_port: default_port(),
            bind_address: default_bind_address(),
            advertised_host: None,
        }
    }
}

impl Default for DiscoverySection {
    fn default() -> Self {
        Self {
            known_hosts: Vec::new(),
            max_tries: 0,
            interval_ms: default_discovery_interval_ms(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            idle_timeout_ms: default_idle_timeout_ms(),
            ack_timeout_ms: default_ack_timeout_ms(),
            handshake_timeout_ms: default_handshake_timeout_ms(),
            max_attempts: default_max_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

impl Default for TickerSection {
    fn default() -> Self {
        Self {
            tick_period_ms: default_tick_period_ms(),
        }
    }
}

impl AppConfig {
    /// Converts the file schema into the runtime configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBindAddress`] if `bind_address` does
    /// not parse as an IP address.
    pub fn to_endpoint_config(&self) -> Result<EndpointConfig, ConfigError> {
        let bind_ip: IpAddr = self
            .network
            .bind_address
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(self.network.bind_address.clone()))?;

        Ok(EndpointConfig {
            rendezvous: RendezvousConfig {
                discovery_port: self.network.discovery_port,
                listen_addr: SocketAddr::new(bind_ip, self.network.listen_port),
                discovery_interval: Duration::from_millis(self.discovery.interval_ms),
                handshake_timeout: Duration::from_millis(self.session.handshake_timeout_ms),
                advertised_host: self.network.advertised_host.clone(),
            },
            session: SessionSettings {
                idle_timeout: Duration::from_millis(self.session.idle_timeout_ms),
                ack_timeout: Duration::from_millis(self.session.ack_timeout_ms),
                max_attempts: self.session.max_attempts,
            },
            max_tries: self.discovery.max_tries,
            known_hosts: self.discovery.known_hosts.clone(),
            reconnect_delay: Duration::from_millis(self.session.reconnect_delay_ms),
            tick_period: Duration::from_millis(self.ticker.tick_period_ms),
        })
    }
}

// ── File access ───────────────────────────────────────────────────────────────

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
