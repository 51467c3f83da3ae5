//! Periodic task multiplexer: many logical timers over one physical tick.
//!
//! A single clock (driven elsewhere, e.g. by a Tokio interval) calls
//! [`TaskMultiplexer::tick`] at a fixed period.  Each registered task keeps a
//! remaining-ticks counter; when it reaches zero the task fires and the
//! counter is reset to the task's period expressed in ticks.
//!
//! ```text
//! tick:          0  1  2  3  4  5  6  7  8  9
//! period 0:      *  *  *  *  *  *  *  *  *  *
//! period 3:      *        *        *        *
//! ```
//!
//! # Exclusivity
//!
//! [`tick`](TaskMultiplexer::tick) and [`register`](TaskMultiplexer::register)
//! both take `&mut self`, so a whole tick is always processed without a
//! registration interleaving.  Shared drivers wrap the multiplexer in a mutex
//! and hold the lock for the full tick.

use std::time::Duration;

use tracing::debug;

/// Default physical tick period.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(100);

/// Callback invoked when a task fires; receives the physical tick period.
pub type TaskCallback = Box<dyn FnMut(Duration) + Send>;

/// Stable identifier of a registered task.
///
/// Handles are indices into the registration arena and remain valid for the
/// multiplexer's lifetime (tasks are never removed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(usize);

impl TaskHandle {
    /// Registration index of this task (0 for the first task).
    pub fn index(self) -> usize {
        self.0
    }
}

/// One registered task and its countdown.
struct TimedTask {
    period_ticks: u64,
    remaining: i64,
    callback: TaskCallback,
}

/// Ordered registry of periodic tasks sharing one tick source.
pub struct TaskMultiplexer {
    tick_period: Duration,
    tasks: Vec<TimedTask>,
    ticks_elapsed: u64,
}

impl TaskMultiplexer {
    /// Creates an empty multiplexer ticking every `tick_period`.
    ///
    /// A zero period is raised to one millisecond.
    pub fn new(tick_period: Duration) -> Self {
        Self {
            tick_period: tick_period.max(Duration::from_millis(1)),
            tasks: Vec::new(),
            ticks_elapsed: 0,
        }
    }

    /// Physical tick period passed to every callback.
    pub fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Number of completed calls to [`tick`](Self::tick).
    pub fn ticks_elapsed(&self) -> u64 {
        self.ticks_elapsed
    }

    /// Registers `callback` to run every `period`.
    ///
    /// The period is converted to whole ticks, rounding down; anything
    /// shorter than one tick (including zero) fires on every tick.  A new
    /// task fires on the first tick after registration.
    pub fn register<F>(&mut self, period: Duration, callback: F) -> TaskHandle
    where
        F: FnMut(Duration) + Send + 'static,
    {
        let period_ticks = self.ticks_for(period);
        let handle = TaskHandle(self.tasks.len());
        self.tasks.push(TimedTask {
            period_ticks,
            remaining: 0,
            callback: Box::new(callback),
        });
        debug!(
            "registered timed task #{} every {period_ticks} tick(s)",
            handle.0
        );
        handle
    }

    /// Period of a registered task in ticks, or `None` for a foreign handle.
    pub fn period_in_ticks(&self, handle: TaskHandle) -> Option<u64> {
        self.tasks.get(handle.0).map(|t| t.period_ticks)
    }

    /// Processes one physical tick and returns how many tasks fired.
    ///
    /// Tasks are visited in registration order.
    pub fn tick(&mut self) -> usize {
        let tick_period = self.tick_period;
        let mut fired = 0;
        for task in &mut self.tasks {
            if task.remaining <= 0 {
                (task.callback)(tick_period);
                task.remaining = task.period_ticks as i64;
                fired += 1;
            }
            task.remaining -= 1;
        }
        self.ticks_elapsed += 1;
        fired
    }

    fn ticks_for(&self, period: Duration) -> u64 {
        (period.as_nanos() / self.tick_period.as_nanos()) as u64
    }
}

impl Default for TaskMultiplexer {
    fn default() -> Self {
        Self::new(DEFAULT_TICK_PERIOD)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
