//! Tokio driver for the periodic task multiplexer.
//!
//! [`Ticker`] shares one [`TaskMultiplexer`] between registering code and a
//! background task that calls [`TaskMultiplexer::tick`] on a
//! `tokio::time::interval`.  The mutex is held for a whole tick, so a
//! registration never interleaves with a tick in progress.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use attendance_core::{TaskHandle, TaskMultiplexer};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Shared handle to a multiplexer and its tick period.
#[derive(Clone)]
pub struct Ticker {
    mux: Arc<Mutex<TaskMultiplexer>>,
}

impl Ticker {
    pub fn new(tick_period: Duration) -> Self {
        Self {
            mux: Arc::new(Mutex::new(TaskMultiplexer::new(tick_period))),
        }
    }

    /// Registers a callback fired every `period` (rounded down to ticks).
    pub fn register<F>(&self, period: Duration, callback: F) -> TaskHandle
    where
        F: FnMut(Duration) + Send + 'static,
    {
        self.lock().register(period, callback)
    }

    /// Processes one tick immediately and returns how many tasks fired.
    pub fn tick_now(&self) -> usize {
        self.lock().tick()
    }

    pub fn tick_period(&self) -> Duration {
        self.lock().tick_period()
    }

    /// Spawns the background task ticking at the multiplexer's period.
    ///
    /// The first tick happens immediately.  Ticks delayed by a slow callback
    /// are not bunched up afterwards.
    pub fn spawn(&self) -> JoinHandle<()> {
        let ticker = self.clone();
        let period = self.tick_period();
        tokio::spawn(async move {
            debug!("ticker started with period {period:?}");
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                ticker.tick_now();
            }
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TaskMultiplexer> {
        self.mux.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
