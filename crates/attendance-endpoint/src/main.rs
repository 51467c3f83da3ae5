//! Attendance endpoint: entry point.
//!
//! Runs an endpoint that finds its peer on the LAN, keeps the session alive,
//! and delivers verification codes typed on standard input (one unsigned
//! decimal code per line).  Each code is stamped with the current time,
//! submitted, and its acknowledged expiry is logged.
//!
//! # Usage
//!
//! ```text
//! attendance-endpoint [OPTIONS]
//!
//! Options:
//!   --config <PATH>                 TOML configuration file
//!   --hosts <LIST>                  Comma-separated hosts to probe [default: broadcast]
//!   --max-tries <N>                 Probes per host, 0 = unlimited
//!   --discovery-port <PORT>         UDP discovery port [default: 5789]
//!   --listen-port <PORT>            TCP listen port [default: 5789]
//!   --discovery-interval-ms <MS>    Wait after each probe [default: 5000]
//!   --advertise-host <HOST>         Host placed in probes [default: auto]
//!   --expiry-wait-ms <MS>           Wait for each code's expiry, <= 0 waits forever
//!   --status-interval-secs <SECS>   Connection status log period
//! ```
//!
//! Command-line values override the configuration file, which overrides the
//! built-in defaults.
//!
//! # Environment variable overrides
//!
//! | Variable                     | Flag               |
//! |------------------------------|--------------------|
//! | `ATTENDANCE_CONFIG`          | `--config`         |
//! | `ATTENDANCE_HOSTS`           | `--hosts`          |
//! | `ATTENDANCE_MAX_TRIES`       | `--max-tries`      |
//! | `ATTENDANCE_DISCOVERY_PORT`  | `--discovery-port` |
//! | `ATTENDANCE_LISTEN_PORT`     | `--listen-port`    |
//!
//! `RUST_LOG` takes precedence over the configured `log_level`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use attendance_core::domain::code::to_epoch_secs;
use attendance_core::VerificationCode;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use attendance_endpoint::application::outbox::timeout_from_millis;
use attendance_endpoint::config::{parse_host_list, EndpointConfig};
use attendance_endpoint::infrastructure::storage::config::{load_config, AppConfig};
use attendance_endpoint::infrastructure::ticker::Ticker;
use attendance_endpoint::Endpoint;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Attendance code endpoint.
///
/// Finds the attendance peer on the LAN and delivers the verification codes
/// read from standard input.
#[derive(Debug, Parser)]
#[command(
    name = "attendance-endpoint",
    about = "Delivers attendance verification codes to a LAN peer",
    version
)]
struct Cli {
    /// TOML configuration file.  A missing file means built-in defaults.
    #[arg(long, env = "ATTENDANCE_CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated hosts to probe in order; empty probes by broadcast.
    #[arg(long, env = "ATTENDANCE_HOSTS")]
    hosts: Option<String>,

    /// Discovery probes per host before moving on; 0 probes forever.
    #[arg(long, env = "ATTENDANCE_MAX_TRIES")]
    max_tries: Option<u32>,

    /// UDP port the discovery probes are sent to.
    #[arg(long, env = "ATTENDANCE_DISCOVERY_PORT")]
    discovery_port: Option<u16>,

    /// TCP port the peer connects back to.
    #[arg(long, env = "ATTENDANCE_LISTEN_PORT")]
    listen_port: Option<u16>,

    /// Milliseconds to wait for a connect-back after each probe.
    #[arg(long)]
    discovery_interval_ms: Option<u64>,

    /// Host advertised in discovery probes instead of the detected address.
    #[arg(long)]
    advertise_host: Option<String>,

    /// Milliseconds to wait for each code's expiry; zero or less waits
    /// until it arrives.
    #[arg(long, default_value_t = 30_000, allow_negative_numbers = true)]
    expiry_wait_ms: i64,

    /// Seconds between connection status log lines.
    #[arg(long, default_value_t = 30)]
    status_interval_secs: u64,
}

impl Cli {
    /// Reads the configuration file named by `--config`, if any.
    fn load_file_config(&self) -> anyhow::Result<AppConfig> {
        match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("loading configuration from {}", path.display())),
            None => Ok(AppConfig::default()),
        }
    }

    /// Builds the runtime configuration: file values, then CLI overrides.
    fn into_endpoint_config(self, file: &AppConfig) -> anyhow::Result<EndpointConfig> {
        let mut config = file
            .to_endpoint_config()
            .context("invalid configuration file")?;

        if let Some(hosts) = &self.hosts {
            config.known_hosts = parse_host_list(hosts);
        }
        if let Some(max_tries) = self.max_tries {
            config.max_tries = max_tries;
        }
        if let Some(port) = self.discovery_port {
            config.rendezvous.discovery_port = port;
        }
        if let Some(port) = self.listen_port {
            config.set_listen_port(port);
        }
        if let Some(ms) = self.discovery_interval_ms {
            config.rendezvous.discovery_interval = Duration::from_millis(ms);
        }
        if let Some(host) = self.advertise_host {
            config.rendezvous.advertised_host = Some(host);
        }
        Ok(config)
    }
}

// ── Console driver ────────────────────────────────────────────────────────────

/// Parses one line of console input as a code value.
fn parse_code(line: &str) -> Option<u64> {
    line.trim().parse().ok()
}

/// Submits every code read from stdin until stdin closes.
async fn read_codes(endpoint: Arc<Endpoint>, wait: Option<Duration>) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        let Some(value) = parse_code(&line) else {
            warn!("bad code {:?}: expected an unsigned integer", line.trim());
            continue;
        };

        match endpoint
            .submit_code_and_await_expiry(VerificationCode::now(value), wait)
            .await
        {
            Ok(Some(expiry)) => info!("code {value} valid until {}", to_epoch_secs(expiry)),
            Ok(None) => warn!("no expiry for code {value} yet; it stays queued"),
            Err(e) => warn!("code {value} not submitted: {e}"),
        }
    }
    info!("stdin closed; no more codes will be read");
    Ok(())
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let file = cli.load_file_config()?;

    // RUST_LOG wins; otherwise the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&file.log_level)),
        )
        .init();

    let wait = timeout_from_millis(cli.expiry_wait_ms);
    let status_interval = Duration::from_secs(cli.status_interval_secs);
    let config = cli.into_endpoint_config(&file)?;

    info!(
        "attendance endpoint starting: hosts={:?}, discovery port {}, listening on {}",
        config.known_hosts, config.rendezvous.discovery_port, config.rendezvous.listen_addr
    );

    let ticker = Ticker::new(config.tick_period);
    let endpoint = Arc::new(Endpoint::new(config));
    endpoint.set_on_expiry_received(|code| {
        debug!(
            "code {} acknowledged, expires at {}",
            code.value(),
            to_epoch_secs(code.timestamp())
        )
    });

    let state = Arc::clone(endpoint.state_machine());
    ticker.register(status_interval, move |_| info!("connection status: {}", state.current()));
    let ticker_task = ticker.spawn();

    let supervisor = {
        let endpoint = Arc::clone(&endpoint);
        tokio::spawn(async move { endpoint.run_forever().await })
    };

    let console = {
        let endpoint = Arc::clone(&endpoint);
        tokio::spawn(async move {
            if let Err(e) = read_codes(endpoint, wait).await {
                error!("console input failed: {e:#}");
            }
        })
    };

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C; shutting down");

    console.abort();
    supervisor.abort();
    ticker_task.abort();
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
