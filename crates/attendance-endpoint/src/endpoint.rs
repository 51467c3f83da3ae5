//! The endpoint facade.
//!
//! [`Endpoint`] wires the connection state machine, the code outbox, the
//! rendezvous, and the session loop together.  Embedding applications
//! create one endpoint, register their listeners, start
//! [`Endpoint::run_forever`] on a task, and submit codes from anywhere.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use attendance_core::VerificationCode;
//! use attendance_endpoint::{config::EndpointConfig, Endpoint};
//!
//! # async fn demo() {
//! let endpoint = Arc::new(Endpoint::new(EndpointConfig::default()));
//! endpoint.subscribe(|state| println!("now {state}"));
//!
//! let supervisor = Arc::clone(&endpoint);
//! tokio::spawn(async move { supervisor.run_forever().await });
//!
//! let expiry = endpoint
//!     .submit_code_and_await_expiry(VerificationCode::now(4242), None)
//!     .await;
//! # }
//! ```

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use attendance_core::{ConnectionState, VerificationCode};
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use crate::application::outbox::CodeOutbox;
use crate::application::session::SessionLoop;
use crate::application::state_machine::ConnectionStateMachine;
use crate::config::EndpointConfig;
use crate::error::EndpointError;
use crate::infrastructure::network::{Rendezvous, TcpFrameTransport};

/// One attendance endpoint: state, pending codes, and the network loop.
pub struct Endpoint {
    config: EndpointConfig,
    state: Arc<ConnectionStateMachine>,
    outbox: Arc<CodeOutbox>,
    rendezvous: Rendezvous,
    session: Mutex<SessionLoop>,
}

impl Endpoint {
    pub fn new(config: EndpointConfig) -> Self {
        let state = Arc::new(ConnectionStateMachine::new());
        let (outbox, queue) = CodeOutbox::new();
        let outbox = Arc::new(outbox);
        let rendezvous = Rendezvous::new(config.rendezvous.clone(), Arc::clone(&state));
        let session = SessionLoop::new(
            config.session.clone(),
            Arc::clone(&state),
            Arc::clone(&outbox),
            queue,
        );
        Self {
            config,
            state,
            outbox,
            rendezvous,
            session: Mutex::new(session),
        }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state.current()
    }

    pub fn state_machine(&self) -> &Arc<ConnectionStateMachine> {
        &self.state
    }

    /// Registers a listener called synchronously on every state transition.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.state.subscribe(listener);
    }

    /// Receiver observing the latest state from async code.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.watch()
    }

    /// Queues `code` for delivery; see [`CodeOutbox::submit_code`].
    pub fn submit_code(&self, code: VerificationCode) {
        self.outbox.submit_code(code);
    }

    /// Queues `code` and waits for its expiry; see
    /// [`CodeOutbox::submit_code_and_await_expiry`].
    pub async fn submit_code_and_await_expiry(
        &self,
        code: VerificationCode,
        timeout: Option<Duration>,
    ) -> Result<Option<SystemTime>, EndpointError> {
        self.outbox.submit_code_and_await_expiry(code, timeout).await
    }

    /// Installs the hook called with every acknowledged code.
    pub fn set_on_expiry_received<F>(&self, hook: F)
    where
        F: Fn(&VerificationCode) + Send + Sync + 'static,
    {
        self.outbox.set_on_expiry_received(hook);
    }

    /// Runs the rendezvous; see [`Rendezvous::connect`].
    pub async fn connect(
        &self,
        max_tries: u32,
        known_hosts: &[String],
    ) -> Result<TcpFrameTransport, EndpointError> {
        self.rendezvous.connect(max_tries, known_hosts).await
    }

    /// Runs the session loop on `transport` until it fails.
    pub async fn communicate(&self, transport: &mut TcpFrameTransport) -> EndpointError {
        let mut session = self.session.lock().await;
        let id = transport.session_id();
        info!(session = %id, "session started");
        let error = session.run(transport).await;
        info!(session = %id, "session finished");
        error
    }

    /// One connect-then-communicate cycle using the configured hosts and
    /// try budget.  Returns the error that ended it.
    pub async fn run_once(&self) -> EndpointError {
        match self
            .connect(self.config.max_tries, &self.config.known_hosts)
            .await
        {
            Ok(mut transport) => self.communicate(&mut transport).await,
            Err(e) => e,
        }
    }

    /// Connects and communicates forever, pausing `reconnect_delay` after
    /// each failure.  Never returns; cancel the task to stop it.
    pub async fn run_forever(&self) {
        loop {
            let error = self.run_once().await;
            warn!(
                "connection cycle ended: {error}; retrying in {:?}",
                self.config.reconnect_delay
            );
            tokio::time::sleep(self.config.reconnect_delay).await;
        }
    }

    /// Value the next heartbeat will carry.
    ///
    /// Waits for the running session, if any, to end.
    pub async fn heartbeat_counter(&self) -> u64 {
        self.session.lock().await.counter().current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_endpoint_starts_disconnected() {
        let endpoint = Endpoint::new(EndpointConfig::default());
        assert_eq!(endpoint.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_new_endpoint_counter_starts_at_zero() {
        let endpoint = Endpoint::new(EndpointConfig::default());
        assert_eq!(endpoint.heartbeat_counter().await, 0);
    }

    #[tokio::test]
    async fn test_codes_submitted_while_disconnected_stay_queued() {
        let endpoint = Endpoint::new(EndpointConfig::default());

        let expiry = endpoint
            .submit_code_and_await_expiry(VerificationCode::now(1), Some(Duration::from_millis(10)))
            .await
            .unwrap();

        assert_eq!(expiry, None);
    }
}
