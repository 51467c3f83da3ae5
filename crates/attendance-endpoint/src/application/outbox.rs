//! Code submission and expiry synchronization.
//!
//! [`CodeOutbox`] is the producer side of the pending-code queue.  Any task
//! may submit codes; the session loop owns the consumer ([`CodeQueue`]) and
//! reports each acknowledged expiry back through
//! [`CodeOutbox::deliver_expiry`], or a dropped code through
//! [`CodeOutbox::abandon`].
//!
//! A caller that needs the expiry synchronously uses
//! [`CodeOutbox::submit_code_and_await_expiry`].  At most one such caller
//! may wait at a time; the waiter is keyed on the exact code it submitted,
//! so acknowledgements of other codes never wake it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

use attendance_core::VerificationCode;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::EndpointError;

/// Consumer side of the pending-code queue, owned by the session loop.
pub type CodeQueue = mpsc::UnboundedReceiver<VerificationCode>;

/// Callback receiving each acknowledged code with its expiry as timestamp.
pub type ExpiryHook = Arc<dyn Fn(&VerificationCode) + Send + Sync>;

struct ExpiryWaiter {
    token: u64,
    code: VerificationCode,
    tx: oneshot::Sender<SystemTime>,
}

/// Producer side of the pending-code queue plus expiry notification.
pub struct CodeOutbox {
    tx: mpsc::UnboundedSender<VerificationCode>,
    waiter: Mutex<Option<ExpiryWaiter>>,
    next_token: AtomicU64,
    hook: RwLock<Option<ExpiryHook>>,
}

impl CodeOutbox {
    /// Creates an outbox and the queue the session loop drains.
    pub fn new() -> (Self, CodeQueue) {
        let (tx, rx) = mpsc::unbounded_channel();
        let outbox = Self {
            tx,
            waiter: Mutex::new(None),
            next_token: AtomicU64::new(0),
            hook: RwLock::new(None),
        };
        (outbox, rx)
    }

    /// Enqueues `code` for delivery and returns immediately.
    ///
    /// Codes are delivered in submission order.  If the queue consumer is
    /// gone the code is dropped with a warning.
    pub fn submit_code(&self, code: VerificationCode) {
        debug!("queued code {}", code.value());
        if self.tx.send(code).is_err() {
            warn!("code {} dropped: session queue closed", code.value());
        }
    }

    /// Enqueues `code` and waits until the peer acknowledges it.
    ///
    /// Returns `Ok(Some(expiry))` once acknowledged, or `Ok(None)` if
    /// `timeout` elapses first (`None` waits indefinitely) or the session
    /// drops the code.  The code stays
    /// queued after a timeout and may still be delivered later.
    ///
    /// # Errors
    ///
    /// [`EndpointError::AwaitInProgress`] if another caller is already
    /// waiting; in that case `code` is not enqueued.
    pub async fn submit_code_and_await_expiry(
        &self,
        code: VerificationCode,
        timeout: Option<Duration>,
    ) -> Result<Option<SystemTime>, EndpointError> {
        let (tx, rx) = oneshot::channel();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut slot = self.waiter.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                return Err(EndpointError::AwaitInProgress);
            }
            *slot = Some(ExpiryWaiter { token, code, tx });
        }
        // Clears the slot however this future ends, including cancellation.
        let _guard = WaiterGuard {
            slot: &self.waiter,
            token,
        };

        self.submit_code(code);

        let expiry = match timeout {
            Some(limit) => match tokio::time::timeout(limit, rx).await {
                Ok(delivered) => delivered.ok(),
                Err(_) => {
                    debug!("no expiry for code {} within {limit:?}", code.value());
                    None
                }
            },
            None => rx.await.ok(),
        };
        Ok(expiry)
    }

    /// Installs the hook called for every acknowledged code.
    ///
    /// Replaces any previously installed hook.
    pub fn set_on_expiry_received<F>(&self, hook: F)
    where
        F: Fn(&VerificationCode) + Send + Sync + 'static,
    {
        *self.hook.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }

    /// Reports that the peer acknowledged `sent` with expiry `valid_to`.
    ///
    /// Wakes the waiter if it is waiting for exactly `sent`, then calls the
    /// expiry hook with an acknowledged copy of the code.
    pub fn deliver_expiry(&self, sent: &VerificationCode, valid_to: SystemTime) {
        if valid_to <= sent.timestamp() {
            warn!(
                "code {} acknowledged with an expiry not after its generation time",
                sent.value()
            );
        }

        if let Some(waiter) = self.take_waiter_for(sent) {
            // The receiver may already have timed out.
            let _ = waiter.tx.send(valid_to);
        }

        let hook = self
            .hook
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(hook) = hook {
            hook(&sent.acknowledged(valid_to));
        }
    }

    /// Reports that `code` was given up on without an acknowledgement.
    ///
    /// A caller awaiting exactly `code` is released with `Ok(None)`.
    pub fn abandon(&self, code: &VerificationCode) {
        if self.take_waiter_for(code).is_some() {
            debug!("released the waiter for abandoned code {}", code.value());
        }
    }

    fn take_waiter_for(&self, code: &VerificationCode) -> Option<ExpiryWaiter> {
        let mut slot = self.waiter.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(w) if w.code == *code => slot.take(),
            _ => None,
        }
    }
}

struct WaiterGuard<'a> {
    slot: &'a Mutex<Option<ExpiryWaiter>>,
    token: u64,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().map(|w| w.token) == Some(self.token) {
            slot.take();
        }
    }
}

/// Converts a millisecond timeout where non-positive means "wait forever".
pub fn timeout_from_millis(millis: i64) -> Option<Duration> {
    u64::try_from(millis)
        .ok()
        .filter(|&ms| ms > 0)
        .map(Duration::from_millis)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
