//! Session loop use case: code delivery and heartbeat over one connection.
//!
//! Entered once a handshake has succeeded.  Each iteration waits up to
//! `idle_timeout` for a queued code:
//!
//! - **Code available**: send it and wait for `ack/code`, retrying on
//!   timeout up to `max_attempts` times.  The acknowledged expiry is handed
//!   to the [`CodeOutbox`].
//! - **Idle**: send a heartbeat with the local counter, retrying on timeout
//!   up to `max_attempts` times.  The first unanswered attempt moves the
//!   state to `ConnectedProblem`; an answer restores `ConnectedGood`.  When
//!   the peer echoes a different counter the endpoint sends a correction and
//!   requires its acknowledgement.
//!
//! Only timeouts are retried.  A reply that arrives but is malformed or
//! targets the wrong request is a protocol error and ends the session, as
//! does a closed connection.  Every session ends in `Disconnected`.

use std::sync::Arc;
use std::time::Duration;

use attendance_core::domain::code::from_epoch_secs;
use attendance_core::{
    expect_acknowledgement, Acknowledgement, ConnectionState, HeartbeatCounter, Message,
    ProtocolError, RequestKind, VerificationCode,
};
use tracing::{debug, info, warn};

use crate::application::outbox::{CodeOutbox, CodeQueue};
use crate::application::state_machine::ConnectionStateMachine;
use crate::application::transport::{recv_acknowledgement, send_message, FrameTransport};
use crate::error::EndpointError;

/// Timing and retry parameters of the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    /// How long to wait for a queued code before sending a heartbeat.
    pub idle_timeout: Duration,
    /// How long to wait for each acknowledgement.
    pub ack_timeout: Duration,
    /// Send attempts per code or heartbeat before giving up.
    pub max_attempts: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(10),
            ack_timeout: Duration::from_secs(1),
            max_attempts: 3,
        }
    }
}

/// Drives one connected session at a time.
///
/// The loop owns the pending-code queue and the heartbeat counter, so both
/// survive reconnects: codes submitted while disconnected are delivered by
/// the next session and the counter continues where it left off.
pub struct SessionLoop {
    settings: SessionSettings,
    state: Arc<ConnectionStateMachine>,
    outbox: Arc<CodeOutbox>,
    queue: CodeQueue,
    counter: HeartbeatCounter,
}

impl SessionLoop {
    pub fn new(
        settings: SessionSettings,
        state: Arc<ConnectionStateMachine>,
        outbox: Arc<CodeOutbox>,
        queue: CodeQueue,
    ) -> Self {
        Self {
            settings,
            state,
            outbox,
            queue,
            counter: HeartbeatCounter::new(),
        }
    }

    /// Returns the heartbeat counter value the next heartbeat will carry.
    pub fn counter(&self) -> HeartbeatCounter {
        self.counter
    }

    /// Runs the session until it fails and returns the error that ended it.
    ///
    /// Sets `ConnectedGood` on entry and `Disconnected` on exit.
    pub async fn run<T>(&mut self, transport: &mut T) -> EndpointError
    where
        T: FrameTransport + ?Sized,
    {
        self.state.transition(ConnectionState::ConnectedGood);
        let error = loop {
            if let Err(e) = self.run_once(transport).await {
                break e;
            }
        };
        warn!("session ended: {error}");
        self.state.transition(ConnectionState::Disconnected);
        error
    }

    /// One iteration: deliver a queued code, or heartbeat when idle.
    async fn run_once<T>(&mut self, transport: &mut T) -> Result<(), EndpointError>
    where
        T: FrameTransport + ?Sized,
    {
        match tokio::time::timeout(self.settings.idle_timeout, self.queue.recv()).await {
            Ok(Some(code)) => self.deliver_code(transport, code).await,
            Ok(None) => Err(EndpointError::QueueClosed),
            Err(_) => self.heartbeat(transport).await,
        }
    }

    fn attempts(&self) -> u32 {
        self.settings.max_attempts.max(1)
    }

    /// Delivers one dequeued code.  A code that fails is dropped, and any
    /// caller awaiting its expiry is released.
    async fn deliver_code<T>(
        &mut self,
        transport: &mut T,
        code: VerificationCode,
    ) -> Result<(), EndpointError>
    where
        T: FrameTransport + ?Sized,
    {
        let result = self.send_code(transport, code).await;
        if result.is_err() {
            self.outbox.abandon(&code);
        }
        result
    }

    async fn send_code<T>(
        &mut self,
        transport: &mut T,
        code: VerificationCode,
    ) -> Result<(), EndpointError>
    where
        T: FrameTransport + ?Sized,
    {
        let request = Message::Code(code.to_message());
        let attempts = self.attempts();
        for attempt in 1..=attempts {
            send_message(transport, &request).await?;
            match recv_acknowledgement(transport, RequestKind::Code, self.settings.ack_timeout)
                .await?
            {
                Some(Acknowledgement::Code { valid_to }) => {
                    info!("code {} valid until {valid_to}", code.value());
                    self.outbox.deliver_expiry(&code, from_epoch_secs(valid_to));
                    return Ok(());
                }
                Some(other) => return Err(wrong_target(RequestKind::Code, &other)),
                None => warn!(
                    "code {} unacknowledged (attempt {attempt}/{attempts})",
                    code.value()
                ),
            }
        }
        Err(EndpointError::RetryBudgetExceeded {
            operation: "code",
            attempts,
        })
    }

    async fn heartbeat<T>(&mut self, transport: &mut T) -> Result<(), EndpointError>
    where
        T: FrameTransport + ?Sized,
    {
        let local = self.counter.current();
        let request = Message::Heartbeat { counter: local };
        let attempts = self.attempts();
        for attempt in 1..=attempts {
            send_message(transport, &request).await?;
            match recv_acknowledgement(transport, RequestKind::Heartbeat, self.settings.ack_timeout)
                .await?
            {
                Some(Acknowledgement::Heartbeat { counter: peer }) => {
                    if !self.counter.agrees_with(peer) {
                        self.correct_counter(transport, peer).await?;
                    }
                    self.counter.advance();
                    debug!("heartbeat {local} acknowledged");
                    self.state.transition_if_changed(ConnectionState::ConnectedGood);
                    return Ok(());
                }
                Some(other) => return Err(wrong_target(RequestKind::Heartbeat, &other)),
                None => {
                    warn!("heartbeat {local} unacknowledged (attempt {attempt}/{attempts})");
                    self.state
                        .transition_if_changed(ConnectionState::ConnectedProblem);
                }
            }
        }
        Err(EndpointError::RetryBudgetExceeded {
            operation: "heartbeat",
            attempts,
        })
    }

    /// Sends our counter as authoritative and requires its acknowledgement.
    async fn correct_counter<T>(&mut self, transport: &mut T, peer: u64) -> Result<(), EndpointError>
    where
        T: FrameTransport + ?Sized,
    {
        let local = self.counter.current();
        warn!("peer heartbeat counter {peer} disagrees with local {local}; correcting");

        let correction = Message::HeartbeatError { counter: local };
        send_message(transport, &correction)
            .await
            .map_err(|e| EndpointError::CounterCorrection(e.to_string()))?;

        match transport.recv_frame(self.settings.ack_timeout).await {
            Ok(Some(frame)) => expect_acknowledgement(&frame, RequestKind::HeartbeatError)
                .map(|_| ())
                .map_err(|e| EndpointError::CounterCorrection(e.to_string())),
            Ok(None) => Err(EndpointError::CounterCorrection(
                "correction unacknowledged".to_string(),
            )),
            Err(e) => Err(EndpointError::CounterCorrection(e.to_string())),
        }
    }
}

fn wrong_target(expected: RequestKind, got: &Acknowledgement) -> EndpointError {
    ProtocolError::WrongTarget {
        expected,
        got: got.targeting(),
    }
    .into()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
