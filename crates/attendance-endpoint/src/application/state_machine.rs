//! Connection state holder with synchronous change notification.
//!
//! The state machine is the single owner of the current [`ConnectionState`].
//! Rendezvous and the session loop drive it through [`transition`]; the UI
//! (or any other observer) registers listeners with [`subscribe`].
//!
//! # Delivery guarantees
//!
//! - Listeners run synchronously on the transitioning thread, in
//!   registration order, before `transition` returns.
//! - Transitions are serialized: a second `transition` waits until every
//!   listener of the first has returned, so observers see changes in the
//!   order they happened.
//! - Listeners may call [`current`] but must not call `transition` (that
//!   would deadlock) and should return quickly.
//!
//! Async observers can use [`watch`] instead, which never blocks the
//! transitioning task.
//!
//! [`transition`]: ConnectionStateMachine::transition
//! [`subscribe`]: ConnectionStateMachine::subscribe
//! [`current`]: ConnectionStateMachine::current
//! [`watch`]: ConnectionStateMachine::watch

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use attendance_core::ConnectionState;
use tokio::sync::watch;
use tracing::info;

/// Callback invoked with the new state on every transition.
pub type StateListener = Arc<dyn Fn(ConnectionState) + Send + Sync>;

/// Owner of the current connection state and its listeners.
pub struct ConnectionStateMachine {
    /// Serializes whole transitions, including listener delivery.
    transition_lock: Mutex<()>,
    current: RwLock<ConnectionState>,
    listeners: RwLock<Vec<StateListener>>,
    watch_tx: watch::Sender<ConnectionState>,
}

impl ConnectionStateMachine {
    /// Creates a state machine in [`ConnectionState::Disconnected`].
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transition_lock: Mutex::new(()),
            current: RwLock::new(ConnectionState::Disconnected),
            listeners: RwLock::new(Vec::new()),
            watch_tx,
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> ConnectionState {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Registers `listener`; it is called for every later transition.
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(ConnectionState) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Returns a receiver that observes the latest state without blocking
    /// transitions.
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.watch_tx.subscribe()
    }

    /// Sets the state to `next` and notifies every listener.
    ///
    /// Listeners are notified even when `next` equals the current state.
    pub fn transition(&self, next: ConnectionState) {
        let _serial = self
            .transition_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let previous = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, next)
        };
        info!("connection state {previous} -> {next}");

        // Snapshot so listeners may subscribe or read state without deadlock.
        let listeners: Vec<StateListener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in &listeners {
            listener(next);
        }

        self.watch_tx.send_replace(next);
    }

    /// Transitions only if the state differs from `next`.
    ///
    /// Used for escalation paths that may repeat (e.g. consecutive
    /// unanswered heartbeats) where one notification is enough.
    pub fn transition_if_changed(&self, next: ConnectionState) {
        if self.current() != next {
            self.transition(next);
        }
    }
}

impl Default for ConnectionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
